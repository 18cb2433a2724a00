//! Surface strategy selection and registry population.
//!
//! A session probes the source once, picks one of three surfaces and keeps
//! it until the session ends:
//!
//! - **Direct**: one tool per discovered method (count at or below threshold)
//! - **Meta**: `list_methods`, `get_method_details` and `call_api`
//! - **Fallback**: `test_connection` and `server_info`, when the source is
//!   unreachable or reports nothing usable

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use billbridge_core::Config;
use billbridge_source::Discovery;

use crate::fallback::{ServerInfoTool, TestConnectionTool};
use crate::meta::{CallApiTool, ListMethodsTool, MethodDetailsTool, MethodSet};
use crate::method::MethodTool;
use crate::registry::ToolRegistry;
use crate::synth::ToolSynthesizer;

/// How discovered methods are exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// One tool per method
    Direct,
    /// Three indirection tools
    Meta,
    /// Connectivity and status tools only
    Fallback,
}

impl fmt::Display for SurfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceMode::Direct => write!(f, "direct"),
            SurfaceMode::Meta => write!(f, "meta"),
            SurfaceMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why a session ended up in fallback mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The connectivity probe failed
    Disconnected,
    /// Listing methods failed
    DiscoveryFailed(String),
    /// The source reported no usable methods
    NoMethods,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Disconnected => write!(f, "connection test failed"),
            FallbackReason::DiscoveryFailed(e) => write!(f, "method discovery failed: {}", e),
            FallbackReason::NoMethods => write!(f, "no methods discovered"),
        }
    }
}

/// Pick a surface for a successful discovery of `count` methods.
pub fn select_mode(count: usize, threshold: usize) -> SurfaceMode {
    if count <= threshold {
        SurfaceMode::Direct
    } else {
        SurfaceMode::Meta
    }
}

/// The tool surface chosen for a session.
pub struct Surface {
    /// Selected mode
    pub mode: SurfaceMode,
    /// Tools advertised for the session
    pub registry: ToolRegistry,
    /// Discovered methods the surface was built from
    pub methods: MethodSet,
    /// Set when `mode` is fallback
    pub fallback_reason: Option<FallbackReason>,
}

impl Surface {
    /// Number of discovered methods.
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// Probes the source and builds the session's surface.
pub struct SurfaceBuilder {
    discovery: Arc<Discovery>,
    synthesizer: ToolSynthesizer,
    threshold: usize,
    info_method: String,
    server_name: String,
}

impl SurfaceBuilder {
    /// Create a builder from configuration.
    pub fn new(discovery: Arc<Discovery>, config: &Config) -> Self {
        Self {
            discovery,
            synthesizer: ToolSynthesizer::new(&config.discovery.tool_prefix),
            threshold: config.discovery.meta_threshold,
            info_method: config.source.server_info_method.clone(),
            server_name: config.server.name.clone(),
        }
    }

    /// Override the meta-mode threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Probe, discover and populate a registry. Never fails: any problem
    /// reaching the source yields the fallback surface.
    pub async fn build(self) -> Surface {
        if !self.discovery.test_connection().await {
            warn!(source = self.discovery.source().name(), "Connection test failed");
            return self.fallback(FallbackReason::Disconnected);
        }

        let methods = match self.discovery.methods().await {
            Ok(methods) if methods.is_empty() => return self.fallback(FallbackReason::NoMethods),
            Ok(methods) => Arc::new(methods),
            Err(e) => {
                warn!(error = %e, "Method discovery failed");
                return self.fallback(FallbackReason::DiscoveryFailed(e.to_string()));
            }
        };

        let mode = select_mode(methods.len(), self.threshold);
        let registry = match mode {
            SurfaceMode::Direct => self.direct_registry(&methods).await,
            _ => self.meta_registry(&methods),
        };

        info!(
            mode = %mode,
            methods = methods.len(),
            tools = registry.len(),
            threshold = self.threshold,
            "Tool surface ready"
        );

        Surface {
            mode,
            registry,
            methods,
            fallback_reason: None,
        }
    }

    async fn direct_registry(&self, methods: &[String]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for method in methods {
            let details = self.discovery.details_or_generic(method).await;
            let definition = self.synthesizer.definition(method, &details);
            registry.register(Arc::new(MethodTool::new(
                method.as_str(),
                definition,
                Arc::clone(&self.discovery),
            )));
        }
        registry
    }

    fn meta_registry(&self, methods: &MethodSet) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ListMethodsTool::new(Arc::clone(methods))));
        registry.register(Arc::new(MethodDetailsTool::new(
            Arc::clone(methods),
            Arc::clone(&self.discovery),
        )));
        registry.register(Arc::new(CallApiTool::new(
            Arc::clone(methods),
            Arc::clone(&self.discovery),
        )));
        registry
    }

    fn fallback(self, reason: FallbackReason) -> Surface {
        warn!(reason = %reason, "Serving fallback tools only");

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestConnectionTool::new(Arc::clone(&self.discovery))));
        registry.register(Arc::new(ServerInfoTool::new(
            Arc::clone(&self.discovery),
            self.info_method,
            self.server_name,
            reason.clone(),
        )));

        Surface {
            mode: SurfaceMode::Fallback,
            registry,
            methods: Arc::new(Vec::new()),
            fallback_reason: Some(reason),
        }
    }
}
