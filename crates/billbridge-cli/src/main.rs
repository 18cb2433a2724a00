//! # billbridge-cli
//!
//! Command-line interface for Billbridge.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use billbridge_core::error::format_error_with_suggestion;
use billbridge_core::Config;

mod commands;

/// Billbridge - expose a billing platform's admin API as MCP tools
#[derive(Parser)]
#[command(name = "billbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,
    /// Discover methods and show the tool surface that would be served
    Methods {
        /// Only show methods containing this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Diagnose configuration and connectivity
    Doctor,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration with credentials masked
    Show,
    /// Show the configuration file locations
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // stdout carries protocol frames; logs go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli, config).await {
        match e.downcast_ref::<billbridge_core::Error>() {
            Some(core) => eprintln!("Error: {}", format_error_with_suggestion(core)),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(config).await?,
        Commands::Methods { filter } => commands::methods::run(config, filter.as_deref()).await?,
        Commands::Doctor => commands::doctor::run(&config).await?,
        Commands::Config { action } => commands::config::handle(action, &config, cli.config.as_deref())?,
    }
    Ok(())
}
