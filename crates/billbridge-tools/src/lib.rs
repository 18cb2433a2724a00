//! # billbridge-tools
//!
//! Turns discovered API methods into callable tools.
//!
//! This crate provides:
//! - The [`Tool`] trait and the session's [`ToolRegistry`]
//! - The [`ToolSynthesizer`] deriving names, descriptions and schemas
//! - The three tool surfaces (direct, meta, fallback) and the selector that
//!   picks one per session
//!
//! ## Example
//!
//! ```ignore
//! use billbridge_tools::SurfaceBuilder;
//!
//! let surface = SurfaceBuilder::new(discovery, &config).build().await;
//! println!("{} mode, {} tools", surface.mode, surface.registry.len());
//! let result = surface.registry.execute("list_methods", json!({"filter": "order"})).await?;
//! ```

use thiserror::Error;

pub mod fallback;
pub mod meta;
pub mod method;
pub mod registry;
pub mod surface;
pub mod synth;

pub use registry::{Tool, ToolRegistry};
pub use surface::{select_mode, FallbackReason, Surface, SurfaceBuilder, SurfaceMode};
pub use synth::ToolSynthesizer;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Method is outside the discovered set.
    #[error("Method '{0}' is not available or not permitted")]
    NotPermitted(String),

    /// Required parameter is missing.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The underlying operation failed; carries the source's message.
    #[error("{0}")]
    Invocation(String),

    /// Operation timed out.
    #[error("Tool invocation timed out after {0} seconds")]
    Timeout(u64),
}

impl ToolError {
    /// Create an invalid arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a missing parameter error.
    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create an invocation error.
    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::Invocation(msg.into())
    }
}

impl From<billbridge_source::SourceError> for ToolError {
    fn from(e: billbridge_source::SourceError) -> Self {
        Self::Invocation(e.to_string())
    }
}

impl From<ToolError> for billbridge_core::Error {
    fn from(e: ToolError) -> Self {
        billbridge_core::Error::Tool(e.to_string())
    }
}
