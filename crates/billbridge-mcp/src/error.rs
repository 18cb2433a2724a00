//! MCP-specific error types.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to write to the transport.
    #[error("write error: {0}")]
    WriteError(std::io::Error),

    /// Failed to read from the transport.
    #[error("read error: {0}")]
    ReadError(std::io::Error),

    /// A line was not valid UTF-8. The transport stays usable.
    #[error("invalid UTF-8 in input line: {0}")]
    InvalidUtf8(std::string::FromUtf8Error),

    /// The peer closed the input stream.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport is not connected.
    #[error("not connected")]
    NotConnected,
}

/// Errors that can occur while serving a session.
#[derive(Debug, Error)]
pub enum McpError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The engine was driven out of order.
    #[error("invalid engine state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl McpError {
    /// Create an invalid state error.
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<McpError> for billbridge_core::Error {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Transport(TransportError::ReadError(io))
            | McpError::Transport(TransportError::WriteError(io)) => billbridge_core::Error::Io(io),
            other => billbridge_core::Error::Protocol(other.to_string()),
        }
    }
}
