//! Stdio MCP server.

use std::sync::Arc;

use tracing::{info, warn};

use billbridge_core::config::ServerConfig;
use billbridge_core::Config;
use billbridge_mcp::{LineTransport, McpServer};
use billbridge_source::{Discovery, UnavailableSource};

pub async fn run(config: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting billbridge MCP server");

    let mut server = engine(config);
    server.start().await.map_err(billbridge_core::Error::from)?;

    let mut transport = LineTransport::stdio();
    server
        .serve(&mut transport)
        .await
        .map_err(billbridge_core::Error::from)?;
    Ok(())
}

/// Build the engine for `config`.
///
/// An invalid configuration does not stop the server: it serves the
/// fallback tools, which report the configuration errors.
fn engine(config: Config) -> McpServer {
    let validation = config.validate();
    for warning in validation.warnings() {
        warn!("Config warning - {}: {}", warning.field, warning.message);
    }

    let Some(reason) = validation.error_summary() else {
        return McpServer::new(super::discovery(&config), config);
    };

    for error in validation.errors() {
        warn!("Config error - {}: {}", error.field, error.message);
    }
    warn!("Configuration is invalid; serving fallback tools only");

    let fallback = Config {
        server: ServerConfig {
            name: config.server.name,
            ..ServerConfig::default()
        },
        ..Config::default()
    };
    let source = Arc::new(UnavailableSource::new(format!("invalid configuration: {}", reason)));
    let discovery = Arc::new(Discovery::from_config(source, &fallback.discovery));
    McpServer::new(discovery, fallback)
}
