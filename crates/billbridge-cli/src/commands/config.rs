//! Configuration management commands.

use std::path::Path;

use billbridge_core::Config;

use crate::ConfigAction;

pub fn handle(action: ConfigAction, config: &Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml_redacted()?);
        }
        ConfigAction::Path => {
            println!("User:    {:?}", Config::config_dir().join("config.toml"));
            println!("Project: {:?}", Path::new("billbridge.toml"));
            if let Some(path) = explicit {
                println!("Explicit: {:?}", path);
            }
            println!("Environment: BILLBRIDGE_* (use '__' for nested keys, e.g. BILLBRIDGE_SOURCE__URL)");
        }
    }
    Ok(())
}
