//! Error types for Billbridge.
//!
//! Each crate carries its own domain error; all of them convert into the
//! top-level [`Error`] defined here so the binary can report them uniformly.

use thiserror::Error;

/// Result type alias using the Billbridge error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Billbridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Capability source error (transport, API rejection, bad payload)
    #[error("Source error: {0}")]
    Source(String),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Protocol engine error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => {
                Some("Check your config file at ~/.config/billbridge/config.toml or ./billbridge.toml")
            }
            Error::Source(_) => Some(
                "Run 'billbridge doctor' to check the API URL and credentials",
            ),
            Error::Io(_) => Some("Check that stdin/stdout are available to the process"),
            _ => None,
        }
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}
