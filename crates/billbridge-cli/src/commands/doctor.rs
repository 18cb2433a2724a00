//! Diagnostic command to check configuration and connectivity.

use billbridge_core::Config;
use billbridge_tools::select_mode;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    // Configuration
    let config_dir = Config::config_dir();
    println!("Config directory: {:?}", config_dir);
    if config_dir.join("config.toml").exists() {
        println!("  ✓ config.toml found");
    } else {
        println!("  - No config.toml (defaults and environment only)");
    }

    let validation = config.validate();
    println!("\nConfiguration:");
    if validation.issues.is_empty() {
        println!("  ✓ Valid");
    }
    for issue in validation.errors() {
        println!("  ✗ {}: {}", issue.field, issue.message);
    }
    for issue in validation.warnings() {
        println!("  ! {}: {}", issue.field, issue.message);
    }

    // Source
    println!("\nCapability source:");
    if let Some(ref catalog) = config.source.catalog {
        println!("  Catalog: {:?}", catalog);
    } else {
        match config.source.endpoint() {
            Some(endpoint) => println!("  Endpoint: {}", endpoint),
            None => println!("  ✗ No API URL configured"),
        }
        let credential = |set: bool, name: &str| {
            if set {
                println!("  ✓ {} is set", name);
            } else {
                println!("  ✗ {} is not set", name);
            }
        };
        credential(config.source.resolve_identifier().is_some(), "API identifier");
        credential(config.source.resolve_secret().is_some(), "API secret");
    }

    // Connectivity and discovery
    let discovery = super::discovery(config);
    println!("\nConnectivity:");
    if discovery.test_connection().await {
        println!("  ✓ {} responded", config.source.probe_method);
        match discovery.methods().await {
            Ok(methods) => {
                let mode = select_mode(methods.len(), config.discovery.meta_threshold);
                println!("  ✓ {} methods discovered", methods.len());
                if methods.is_empty() {
                    println!("  ✗ Nothing to expose; the server would run in fallback mode");
                } else {
                    println!(
                        "  Surface: {} mode (threshold {})",
                        mode, config.discovery.meta_threshold
                    );
                }
            }
            Err(e) => println!("  ✗ Method discovery failed: {}", e),
        }
    } else {
        println!("  ✗ Connection test failed; the server would run in fallback mode");
    }

    println!("\nDiagnostics complete.");
    Ok(())
}
