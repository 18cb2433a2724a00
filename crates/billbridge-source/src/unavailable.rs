//! Stand-in source used when no real source could be built.
//!
//! Lets the engine start and serve fallback tools with a useful error
//! instead of refusing to start on a configuration problem.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;
use crate::traits::{CapabilitySource, MethodDetails};

/// A source that is never reachable and explains why.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    /// Create from the error that prevented building the real source.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> SourceError {
        SourceError::NotConfigured(self.reason.clone())
    }
}

#[async_trait]
impl CapabilitySource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn test_connection(&self) -> bool {
        false
    }

    async fn list_methods(&self) -> Result<Vec<String>, SourceError> {
        Err(self.error())
    }

    async fn get_method_details(&self, _method: &str) -> Result<MethodDetails, SourceError> {
        Err(self.error())
    }

    async fn invoke(&self, _method: &str, _args: Value) -> Result<Value, SourceError> {
        Err(self.error())
    }
}
