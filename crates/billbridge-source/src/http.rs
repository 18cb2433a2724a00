//! HTTP adapter for the billing platform's administrative API.
//!
//! Every call is a form-encoded POST carrying the action name, the API
//! credentials and `responsetype=json`. The API answers with a JSON object
//! whose `result` field is `success` or `error`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use billbridge_core::config::SourceConfig;

use crate::error::SourceError;
use crate::traits::{CapabilitySource, MethodDetails, ParameterSpec};

/// API credentials. `Debug` never prints the values.
#[derive(Clone)]
struct Credentials {
    identifier: String,
    secret: String,
    access_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Capability source backed by the remote HTTP API.
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    endpoint: String,
    credentials: Credentials,
    timeout_secs: u64,
    probe_method: String,
    list_method: String,
    describe_method: String,
}

impl HttpSource {
    /// Create a source for `endpoint` with the given credentials.
    pub fn new(
        endpoint: impl Into<String>,
        identifier: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let defaults = SourceConfig::default();
        Ok(Self {
            client: build_client(defaults.timeout_secs)?,
            endpoint: endpoint.into(),
            credentials: Credentials {
                identifier: identifier.into(),
                secret: secret.into(),
                access_key: None,
            },
            timeout_secs: defaults.timeout_secs,
            probe_method: defaults.probe_method,
            list_method: defaults.list_method,
            describe_method: defaults.describe_method,
        })
    }

    /// Create from configuration, resolving credentials from the environment.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let endpoint = config
            .endpoint()
            .ok_or_else(|| SourceError::NotConfigured("source.url is not set".to_string()))?;
        let identifier = config.resolve_identifier().ok_or_else(|| {
            SourceError::NotConfigured(format!(
                "API identifier missing (set source.identifier or {})",
                config.identifier_env
            ))
        })?;
        let secret = config.resolve_secret().ok_or_else(|| {
            SourceError::NotConfigured(format!(
                "API secret missing (set source.secret or {})",
                config.secret_env
            ))
        })?;

        let mut source = Self::new(endpoint, identifier, secret)?.with_timeout(config.timeout_secs)?;
        source.credentials.access_key = config.access_key.clone();
        source.probe_method = config.probe_method.clone();
        source.list_method = config.list_method.clone();
        source.describe_method = config.describe_method.clone();
        Ok(source)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Result<Self, SourceError> {
        self.client = build_client(seconds)?;
        self.timeout_secs = seconds;
        Ok(self)
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one action to the API and return the decoded success payload.
    #[instrument(skip(self, args), fields(endpoint = %self.endpoint))]
    async fn call(&self, action: &str, args: &Value) -> Result<Value, SourceError> {
        let mut form = vec![
            ("action".to_string(), action.to_string()),
            ("identifier".to_string(), self.credentials.identifier.clone()),
            ("secret".to_string(), self.credentials.secret.clone()),
            ("responsetype".to_string(), "json".to_string()),
        ];
        if let Some(ref key) = self.credentials.access_key {
            form.push(("accesskey".to_string(), key.clone()));
        }
        form.extend(form_params(args));

        debug!(action, param_count = form.len() - 4, "Sending API request");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(self.timeout_secs)
                } else {
                    SourceError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            warn!(action, status = status.as_u16(), "API request failed");
            return Err(SourceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| SourceError::invalid_response(format!("response is not JSON: {}", e)))?;
        check_result(payload)
    }
}

fn build_client(timeout_secs: u64) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourceError::Client(e.to_string()))
}

/// Flatten JSON arguments into form fields.
///
/// Scalars are sent as-is, arrays of scalars as `name[i]`, and nested
/// objects as a JSON string. Nulls are dropped.
pub fn form_params(args: &Value) -> Vec<(String, String)> {
    let Some(object) = args.as_object() else {
        return Vec::new();
    };

    let mut params = Vec::with_capacity(object.len());
    for (key, value) in object {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some(text) = scalar_text(item) {
                        params.push((format!("{}[{}]", key, i), text));
                    } else {
                        params.push((format!("{}[{}]", key, i), item.to_string()));
                    }
                }
            }
            other => {
                let text = scalar_text(other).unwrap_or_else(|| other.to_string());
                params.push((key.clone(), text));
            }
        }
    }
    params
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        _ => None,
    }
}

fn error_message(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Turn an API payload into a result, honouring `result: error`.
fn check_result(payload: Value) -> Result<Value, SourceError> {
    match payload.get("result").and_then(Value::as_str) {
        Some(result) if result.eq_ignore_ascii_case("error") => Err(SourceError::api(
            error_message(&payload).unwrap_or_else(|| "API returned an error".to_string()),
        )),
        _ => Ok(payload),
    }
}

/// Extract method names from a listing payload.
///
/// Accepts `methods` as an array of names, an array of objects with a
/// `name`, or an object wrapping such an array under `method`.
pub fn parse_method_list(payload: &Value) -> Result<Vec<String>, SourceError> {
    let methods = payload
        .get("methods")
        .ok_or_else(|| SourceError::invalid_response("listing has no 'methods' field"))?;

    let items = match methods {
        Value::Array(items) => items,
        Value::Object(inner) => inner
            .get("method")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::invalid_response("'methods' object has no 'method' array"))?,
        _ => return Err(SourceError::invalid_response("'methods' is not a list")),
    };

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|name| !name.trim().is_empty())
        .collect())
}

/// Extract method details from a description payload.
///
/// Malformed parameter entries are skipped rather than failing the method.
pub fn parse_method_details(payload: &Value) -> MethodDetails {
    let description = payload
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let parameters = match payload.get("parameters") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<ParameterSpec>(item.clone()).ok())
            .collect(),
        Some(Value::Object(map)) => parameters_from_map(map),
        _ => Vec::new(),
    };

    MethodDetails {
        description,
        parameters,
    }
}

/// `{"clientid": {"type": "integer", ...}}` form of a parameter list.
fn parameters_from_map(map: &Map<String, Value>) -> Vec<ParameterSpec> {
    map.iter()
        .filter_map(|(name, spec)| {
            let mut spec = spec.clone();
            spec.as_object_mut()?.insert("name".to_string(), json!(name));
            serde_json::from_value::<ParameterSpec>(spec).ok()
        })
        .collect()
}

#[async_trait]
impl CapabilitySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn test_connection(&self) -> bool {
        match self.call(&self.probe_method, &json!({})).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn list_methods(&self) -> Result<Vec<String>, SourceError> {
        let payload = self.call(&self.list_method, &json!({})).await?;
        parse_method_list(&payload)
    }

    async fn get_method_details(&self, method: &str) -> Result<MethodDetails, SourceError> {
        let payload = self
            .call(&self.describe_method, &json!({ "method": method }))
            .await?;
        Ok(parse_method_details(&payload))
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, SourceError> {
        self.call(method, &args).await
    }
}
