//! CLI command implementations.

pub mod config;
pub mod doctor;
pub mod methods;
pub mod serve;

use std::sync::Arc;

use billbridge_core::Config;
use billbridge_source::Discovery;

/// Discovery over the configured source, or over a stand-in that reports
/// why the source could not be built.
pub fn discovery(config: &Config) -> Arc<Discovery> {
    let source = billbridge_source::from_config_or_unavailable(&config.source);
    Arc::new(Discovery::from_config(source, &config.discovery))
}
