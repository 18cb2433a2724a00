//! # billbridge-source
//!
//! Access to the billing platform's administrative API for Billbridge.
//!
//! This crate provides:
//! - The [`CapabilitySource`] contract the rest of the system consumes
//! - An HTTP adapter for the remote API and an in-memory catalog adapter
//! - A time-bounded [`DiscoveryCache`] and the cached [`Discovery`] facade

pub mod cache;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod http;
pub mod traits;
pub mod unavailable;

pub use cache::{CacheEntry, DiscoveryCache};
pub use catalog::{Catalog, CatalogMethod, CatalogSource};
pub use discovery::Discovery;
pub use error::SourceError;
pub use http::HttpSource;
pub use traits::{CapabilitySource, MethodDetails, ParameterSpec};
pub use unavailable::UnavailableSource;

use std::sync::Arc;

use billbridge_core::config::SourceConfig;

/// Build the capability source described by the configuration.
///
/// A configured catalog takes precedence over the remote API.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn CapabilitySource>, SourceError> {
    if let Some(ref path) = config.catalog {
        return Ok(Arc::new(CatalogSource::from_file(path)?));
    }
    Ok(Arc::new(HttpSource::from_config(config)?))
}

/// Like [`from_config`], but substitutes an [`UnavailableSource`] on failure
/// so the engine can still start in fallback mode.
pub fn from_config_or_unavailable(config: &SourceConfig) -> Arc<dyn CapabilitySource> {
    match from_config(config) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(error = %e, "Capability source unavailable");
            Arc::new(UnavailableSource::new(e.to_string()))
        }
    }
}
