//! In-memory capability source backed by a JSON catalog.
//!
//! Used for offline serving (`source.catalog`) and as a scriptable source in
//! tests: connectivity, listing failures and per-method description failures
//! can all be simulated, and every call is counted.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::SourceError;
use crate::traits::{CapabilitySource, MethodDetails, ParameterSpec};

/// A catalog file: the methods a source reports and canned responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Reported methods, in listing order
    #[serde(default)]
    pub methods: Vec<CatalogMethod>,
    /// Canned invocation responses keyed by method name
    #[serde(default)]
    pub responses: HashMap<String, Value>,
}

/// One method entry in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMethod {
    /// Method name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl CatalogMethod {
    /// Create an undocumented method.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a parameter.
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Capability source serving a [`Catalog`] from memory.
pub struct CatalogSource {
    catalog: Catalog,
    connected: bool,
    list_fails: bool,
    failing_details: HashSet<String>,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    invocations: Mutex<Vec<(String, Value)>>,
}

impl CatalogSource {
    /// Create a source with an empty catalog.
    pub fn new() -> Self {
        Self::from_catalog(Catalog::default())
    }

    /// Create a source serving `catalog`.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            connected: true,
            list_fails: false,
            failing_details: HashSet::new(),
            list_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        debug!(
            path = %path.as_ref().display(),
            methods = catalog.methods.len(),
            "Loaded method catalog"
        );
        Ok(Self::from_catalog(catalog))
    }

    /// Create a source reporting `names` without metadata.
    pub fn with_methods<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut source = Self::new();
        for name in names {
            source.catalog.methods.push(CatalogMethod::new(name));
        }
        source
    }

    /// Add a method entry.
    pub fn with_method(mut self, method: CatalogMethod) -> Self {
        self.catalog.methods.push(method);
        self
    }

    /// Set the canned response for a method.
    pub fn with_response(mut self, method: impl Into<String>, response: Value) -> Self {
        self.catalog.responses.insert(method.into(), response);
        self
    }

    /// Simulate an unreachable API.
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Make `list_methods` fail while connectivity still succeeds.
    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Make `get_method_details` fail for one method.
    pub fn failing_details(mut self, method: impl Into<String>) -> Self {
        self.failing_details.insert(method.into());
        self
    }

    /// Number of `list_methods` calls received.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_method_details` calls received.
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Invocations received so far, as (method, arguments).
    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().clone()
    }

    fn find(&self, method: &str) -> Option<&CatalogMethod> {
        self.catalog.methods.iter().find(|m| m.name == method)
    }
}

impl Default for CatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilitySource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn test_connection(&self) -> bool {
        self.connected
    }

    async fn list_methods(&self) -> Result<Vec<String>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected || self.list_fails {
            return Err(SourceError::Transport("catalog listing unavailable".to_string()));
        }
        Ok(self.catalog.methods.iter().map(|m| m.name.clone()).collect())
    }

    async fn get_method_details(&self, method: &str) -> Result<MethodDetails, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected || self.failing_details.contains(method) {
            return Err(SourceError::Transport(format!(
                "could not describe method '{}'",
                method
            )));
        }
        let entry = self
            .find(method)
            .ok_or_else(|| SourceError::api(format!("Unknown method '{}'", method)))?;
        Ok(MethodDetails {
            description: entry.description.clone(),
            parameters: entry.parameters.clone(),
        })
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, SourceError> {
        self.invocations.lock().push((method.to_string(), args.clone()));
        if !self.connected {
            return Err(SourceError::Transport("catalog source is disconnected".to_string()));
        }

        match self.catalog.responses.get(method) {
            Some(response) if response.get("result").and_then(Value::as_str) == Some("error") => {
                Err(SourceError::api(
                    response
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("API returned an error"),
                ))
            }
            Some(response) => Ok(response.clone()),
            None => Ok(json!({
                "result": "success",
                "action": method,
                "arguments": args,
            })),
        }
    }
}
