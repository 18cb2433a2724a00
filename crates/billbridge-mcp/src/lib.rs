//! # billbridge-mcp
//!
//! MCP (Model Context Protocol) server engine for Billbridge.
//!
//! This crate provides:
//! - JSON-RPC envelopes and the MCP result types
//! - A newline-delimited transport over stdio or any async stream
//! - The [`Session`] that dispatches requests to the tool registry
//! - The [`McpServer`] lifecycle and its sequential serve loop

pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use error::{McpError, TransportError};
pub use server::{EngineState, McpServer, SequentialLoop, ServeLoop, ServeStats};
pub use session::Session;
pub use transport::{LineTransport, Transport};
