//! Cached view of a capability source.
//!
//! `Discovery` owns the session's discovery caches: one entry for the method
//! list and one entry per described method, all sharing the same TTL.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use billbridge_core::config::DiscoveryConfig;

use crate::cache::DiscoveryCache;
use crate::error::SourceError;
use crate::traits::{CapabilitySource, MethodDetails};

/// Cache key of the method list entry.
const METHOD_LIST_KEY: &str = "methods";

/// Discovery caches for one session, wrapping a capability source.
pub struct Discovery {
    source: Arc<dyn CapabilitySource>,
    methods: Mutex<DiscoveryCache<Vec<String>>>,
    details: Mutex<DiscoveryCache<MethodDetails>>,
    excluded: HashSet<String>,
}

impl Discovery {
    /// Create a discovery facade with the given TTL and no exclusions.
    pub fn new(source: Arc<dyn CapabilitySource>, ttl: Duration) -> Self {
        Self {
            source,
            methods: Mutex::new(DiscoveryCache::new(ttl)),
            details: Mutex::new(DiscoveryCache::new(ttl)),
            excluded: HashSet::new(),
        }
    }

    /// Create from discovery configuration.
    pub fn from_config(source: Arc<dyn CapabilitySource>, config: &DiscoveryConfig) -> Self {
        Self::new(source, Duration::from_secs(config.cache_ttl_secs))
            .with_excluded(config.exclude_methods.iter().cloned())
    }

    /// Hide methods from the discovered set (case-insensitive).
    pub fn with_excluded<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded
            .extend(methods.into_iter().map(|m| Into::<String>::into(m).to_lowercase()));
        self
    }

    /// The underlying source.
    pub fn source(&self) -> &Arc<dyn CapabilitySource> {
        &self.source
    }

    /// Whether a method is hidden by configuration.
    pub fn is_excluded(&self, method: &str) -> bool {
        self.excluded.contains(&method.to_lowercase())
    }

    /// Probe connectivity. Never cached.
    pub async fn test_connection(&self) -> bool {
        self.source.test_connection().await
    }

    /// The discovered method names, de-duplicated and with exclusions applied.
    pub async fn methods(&self) -> Result<Vec<String>, SourceError> {
        let mut cache = self.methods.lock().await;
        cache
            .get_or_fetch(METHOD_LIST_KEY, || async {
                let reported = self.source.list_methods().await?;
                let total = reported.len();
                let mut seen = HashSet::with_capacity(total);
                let methods: Vec<String> = reported
                    .into_iter()
                    .filter(|m| !self.is_excluded(m))
                    .filter(|m| seen.insert(m.clone()))
                    .collect();
                debug!(
                    source = self.source.name(),
                    reported = total,
                    kept = methods.len(),
                    "Discovered methods"
                );
                Ok(methods)
            })
            .await
    }

    /// Metadata for one method, cached per method.
    pub async fn details(&self, method: &str) -> Result<MethodDetails, SourceError> {
        let mut cache = self.details.lock().await;
        cache
            .get_or_fetch(method, || self.source.get_method_details(method))
            .await
    }

    /// Metadata for one method, degrading to generic details on failure.
    ///
    /// The generic fallback is not cached, so the next read retries.
    pub async fn details_or_generic(&self, method: &str) -> MethodDetails {
        match self.details(method).await {
            Ok(details) => details,
            Err(e) => {
                warn!(method, error = %e, "Could not describe method, using generic details");
                MethodDetails::generic()
            }
        }
    }

    /// Execute a method on the source.
    pub async fn invoke(&self, method: &str, args: Value) -> Result<Value, SourceError> {
        self.source.invoke(method, args).await
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.methods.lock().await.clear();
        self.details.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogMethod, CatalogSource};
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(300);

    fn discovery(source: Arc<CatalogSource>) -> Discovery {
        Discovery::new(source, TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_method_list_is_cached() {
        let source = Arc::new(CatalogSource::with_methods(["GetClients", "GetOrders"]));
        let discovery = discovery(Arc::clone(&source));

        assert_eq!(discovery.methods().await.unwrap().len(), 2);
        assert_eq!(discovery.methods().await.unwrap().len(), 2);
        assert_eq!(source.list_calls(), 1);

        tokio::time::advance(TTL).await;
        discovery.methods().await.unwrap();
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_and_exclusions_removed() {
        let source = Arc::new(CatalogSource::with_methods([
            "GetClients",
            "DeleteClient",
            "GetClients",
            "GetOrders",
        ]));
        let discovery = discovery(source).with_excluded(["deleteclient"]);

        assert_eq!(
            discovery.methods().await.unwrap(),
            vec!["GetClients".to_string(), "GetOrders".to_string()]
        );
        assert!(discovery.is_excluded("DeleteClient"));
        assert!(!discovery.is_excluded("GetClients"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_failure_propagates_uncached() {
        let source = Arc::new(CatalogSource::with_methods(["GetClients"]).failing_list());
        let discovery = discovery(Arc::clone(&source));

        assert!(discovery.methods().await.is_err());
        assert!(discovery.methods().await.is_err());
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_details_cached_per_method() {
        let source = Arc::new(
            CatalogSource::new()
                .with_method(CatalogMethod::new("GetOrders").with_description("Obtain orders"))
                .with_method(CatalogMethod::new("GetClients")),
        );
        let discovery = discovery(Arc::clone(&source));

        discovery.details("GetOrders").await.unwrap();
        discovery.details("GetOrders").await.unwrap();
        discovery.details("GetClients").await.unwrap();
        assert_eq!(source.detail_calls(), 2);

        discovery.clear().await;
        discovery.details("GetOrders").await.unwrap();
        assert_eq!(source.detail_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_details_degrade_to_generic() {
        let source = Arc::new(CatalogSource::with_methods(["foo", "bar"]).failing_details("foo"));
        let discovery = discovery(Arc::clone(&source));

        assert_eq!(discovery.details_or_generic("foo").await, MethodDetails::generic());
        // Not cached: a second read asks again
        discovery.details_or_generic("foo").await;
        assert_eq!(source.detail_calls(), 2);
    }

    #[tokio::test]
    async fn test_invoke_passes_through() {
        let source = Arc::new(
            CatalogSource::with_methods(["GetClients"])
                .with_response("GetClients", json!({"result": "success", "clients": []})),
        );
        let discovery = discovery(Arc::clone(&source));

        let result = discovery.invoke("GetClients", json!({})).await.unwrap();
        assert_eq!(result["result"], "success");
        assert_eq!(source.invocations().len(), 1);
    }
}
