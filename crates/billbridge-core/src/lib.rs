//! # billbridge-core
//!
//! Core types and abstractions for Billbridge, the bridge that exposes a
//! billing platform's administrative API as a set of callable tools.
//!
//! This crate provides:
//! - Configuration system (layered TOML + environment)
//! - Tool definition types shared by the registry and the protocol engine
//! - Common error types

pub mod config;
pub mod error;
pub mod tool;

pub use config::Config;
pub use error::{Error, Result};
pub use tool::ToolDefinition;
