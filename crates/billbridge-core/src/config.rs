//! Configuration system for Billbridge.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "BILLBRIDGE_";

/// Placeholder printed instead of secret values.
const REDACTED: &str = "********";

/// Main configuration struct for Billbridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote billing API settings
    pub source: SourceConfig,
    /// Discovery and tool-surface settings
    pub discovery: DiscoveryConfig,
    /// Protocol engine settings
    pub server: ServerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Connection settings for the billing platform's administrative API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the billing installation (e.g. https://billing.example.com)
    pub url: Option<String>,
    /// Path of the API endpoint relative to `url`
    pub api_path: String,
    /// API credential identifier (can be set directly or via environment)
    pub identifier: Option<String>,
    /// Environment variable holding the identifier
    pub identifier_env: String,
    /// API credential secret (can be set directly or via environment)
    pub secret: Option<String>,
    /// Environment variable holding the secret
    pub secret_env: String,
    /// Optional access key for installations that require one
    pub access_key: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Cheap action used to test connectivity
    pub probe_method: String,
    /// Action that lists the methods available to the credentials
    pub list_method: String,
    /// Action that describes a single method
    pub describe_method: String,
    /// Action queried by the fallback `server_info` tool
    pub server_info_method: String,
    /// JSON catalog served instead of the remote API
    pub catalog: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_path: "/includes/api.php".to_string(),
            identifier: None,
            identifier_env: "BILLBRIDGE_API_IDENTIFIER".to_string(),
            secret: None,
            secret_env: "BILLBRIDGE_API_SECRET".to_string(),
            access_key: None,
            timeout_secs: 30,
            probe_method: "GetHealthStatus".to_string(),
            list_method: "GetApiMethods".to_string(),
            describe_method: "GetApiMethodDetails".to_string(),
            server_info_method: "GetHealthStatus".to_string(),
            catalog: None,
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| REDACTED);
        f.debug_struct("SourceConfig")
            .field("url", &self.url)
            .field("api_path", &self.api_path)
            .field("identifier", &redact(&self.identifier))
            .field("identifier_env", &self.identifier_env)
            .field("secret", &redact(&self.secret))
            .field("secret_env", &self.secret_env)
            .field("access_key", &redact(&self.access_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("probe_method", &self.probe_method)
            .field("list_method", &self.list_method)
            .field("describe_method", &self.describe_method)
            .field("server_info_method", &self.server_info_method)
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl SourceConfig {
    /// Resolve the identifier from either direct value or environment variable.
    pub fn resolve_identifier(&self) -> Option<String> {
        resolve_secret(&self.identifier, &self.identifier_env)
    }

    /// Resolve the secret from either direct value or environment variable.
    pub fn resolve_secret(&self) -> Option<String> {
        resolve_secret(&self.secret, &self.secret_env)
    }

    /// Full endpoint URL, if a base URL is configured.
    pub fn endpoint(&self) -> Option<String> {
        let base = self.url.as_ref()?;
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.api_path.trim_start_matches('/')
        ))
    }
}

fn resolve_secret(direct: &Option<String>, env_var: &str) -> Option<String> {
    if let Some(value) = direct {
        return Some(value.clone());
    }
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}

/// How discovered methods are turned into tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Lifetime of cached discovery results in seconds
    pub cache_ttl_secs: u64,
    /// Method count above which the meta surface is used
    pub meta_threshold: usize,
    /// Namespace token prepended to per-method tool names
    pub tool_prefix: String,
    /// Methods never exposed or callable (case-insensitive)
    pub exclude_methods: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            meta_threshold: 50,
            tool_prefix: "billing".to_string(),
            exclude_methods: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name reported during the handshake
    pub name: String,
    /// Upper bound on a single tool invocation, in seconds
    pub invocation_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "billbridge".to_string(),
            invocation_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    /// All error-level issues on one line, or `None` when there are none.
    pub fn error_summary(&self) -> Option<String> {
        let errors: Vec<String> = self
            .errors()
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        (!errors.is_empty()).then(|| errors.join("; "))
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "discovery.meta_threshold")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Layers, lowest precedence first: defaults, user config, project
    /// config (`./billbridge.toml`), the explicit file if given, and
    /// `BILLBRIDGE_*` environment variables (`__` separates nested keys).
    pub fn load(explicit: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            .merge(Toml::file("billbridge.toml"));

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load and validate configuration.
    pub fn load_validated(explicit: Option<&Path>) -> Result<Self, Error> {
        Self::load(explicit)
            .map_err(|e| Error::Config(e.to_string()))?
            .into_validated()
    }

    /// Validate, failing on errors and logging warnings.
    pub fn into_validated(self) -> Result<Self, Error> {
        let result = self.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.source.catalog.is_none() {
            match self.source.url {
                None => result.add_warning(
                    "source.url",
                    "No API URL configured; the server will start in fallback mode",
                ),
                Some(ref url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    result.add_error("source.url", "url must start with http:// or https://")
                }
                Some(ref url) if url.starts_with("http://") => result.add_warning(
                    "source.url",
                    "API credentials will be sent over plain HTTP",
                ),
                Some(_) => {}
            }

            if self.source.resolve_identifier().is_none() || self.source.resolve_secret().is_none() {
                result.add_warning(
                    "source.identifier",
                    format!(
                        "API credentials not set (configure them or export {} and {})",
                        self.source.identifier_env, self.source.secret_env
                    ),
                );
            }
        }

        if self.source.timeout_secs == 0 {
            result.add_error("source.timeout_secs", "timeout_secs must be greater than 0");
        }

        for (field, value) in [
            ("source.probe_method", &self.source.probe_method),
            ("source.list_method", &self.source.list_method),
            ("source.describe_method", &self.source.describe_method),
        ] {
            if value.trim().is_empty() {
                result.add_error(field, "method name cannot be empty");
            }
        }

        if self.discovery.meta_threshold == 0 {
            result.add_error("discovery.meta_threshold", "meta_threshold must be greater than 0");
        }

        if self.discovery.cache_ttl_secs == 0 {
            result.add_warning(
                "discovery.cache_ttl_secs",
                "cache_ttl_secs is 0; every discovery read will hit the API",
            );
        }

        let prefix = &self.discovery.tool_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            result.add_error(
                "discovery.tool_prefix",
                format!("Invalid tool prefix '{}'. Use lowercase letters, digits and '_'", prefix),
            );
        }

        if self.server.invocation_timeout_secs == Some(0) {
            result.add_error(
                "server.invocation_timeout_secs",
                "invocation_timeout_secs must be greater than 0 when set",
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!("Invalid log level '{}'. Valid values: {:?}", self.logging.level, valid_levels),
            );
        }

        result
    }

    /// Copy of the configuration with credentials masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(REDACTED.to_string());
            }
        };
        mask(&mut config.source.identifier);
        mask(&mut config.source.secret);
        mask(&mut config.source.access_key);
        config
    }

    /// Render the configuration as TOML with credentials masked.
    pub fn to_toml_redacted(&self) -> Result<String, Error> {
        toml::to_string_pretty(&self.redacted()).map_err(|e| Error::Config(e.to_string()))
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("billbridge"))
            .unwrap_or_else(|| PathBuf::from("~/.config/billbridge"))
    }
}
