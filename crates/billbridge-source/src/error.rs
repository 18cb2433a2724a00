//! Capability source error types.

use thiserror::Error;

/// Errors raised by a capability source.
///
/// The `Display` output is the human-readable message surfaced to callers
/// when an invocation fails, so variants carry the remote message verbatim.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The API processed the request and rejected it.
    #[error("{0}")]
    Api(String),

    /// The API answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request did not complete in time.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// The HTTP client could not be built from the settings.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Required connection settings are missing.
    #[error("source not configured: {0}")]
    NotConfigured(String),

    /// Reading a local catalog failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Create an API rejection error.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<SourceError> for billbridge_core::Error {
    fn from(e: SourceError) -> Self {
        billbridge_core::Error::Source(e.to_string())
    }
}
