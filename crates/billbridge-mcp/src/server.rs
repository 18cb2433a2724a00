//! Engine lifecycle and the serve loop.
//!
//! ```text
//! Uninitialized -> Probing -> Ready(mode) | Degraded -> Serving -> Terminated
//! ```
//!
//! Probing happens exactly once per engine. There is no way back to
//! `Probing`: a new engine is needed to re-discover the source.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use billbridge_core::Config;
use billbridge_source::Discovery;
use billbridge_tools::SurfaceMode;

use crate::error::{McpError, TransportError};
use crate::session::Session;
use crate::transport::Transport;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, nothing probed yet.
    Uninitialized,
    /// Discovering the source.
    Probing,
    /// Discovery succeeded with the given surface.
    Ready(SurfaceMode),
    /// Discovery failed; fallback tools only.
    Degraded,
    /// Reading requests.
    Serving,
    /// Input closed.
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Probing => write!(f, "probing"),
            Self::Ready(mode) => write!(f, "ready ({})", mode),
            Self::Degraded => write!(f, "degraded"),
            Self::Serving => write!(f, "serving"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Counters for one serve run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Lines read, including malformed ones.
    pub lines: u64,
    /// Responses written.
    pub responses: u64,
}

/// Strategy for draining a transport into a session.
///
/// Implementations must write responses in request order.
#[async_trait]
pub trait ServeLoop: Send + Sync {
    /// Serve until the input closes.
    async fn run(&self, session: &Session, transport: &mut dyn Transport) -> Result<ServeStats, McpError>;
}

/// Handles one request completely before reading the next line.
///
/// A slow invocation blocks the requests queued behind it; in exchange,
/// responses can never overtake each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialLoop;

#[async_trait]
impl ServeLoop for SequentialLoop {
    async fn run(&self, session: &Session, transport: &mut dyn Transport) -> Result<ServeStats, McpError> {
        let mut stats = ServeStats::default();

        loop {
            let response = match transport.receive().await {
                Ok(line) => {
                    stats.lines += 1;
                    session.handle_line(&line).await
                }
                Err(TransportError::InvalidUtf8(e)) => {
                    stats.lines += 1;
                    session.reject_undecodable(e)
                }
                Err(TransportError::ConnectionClosed) => break,
                Err(e) => return Err(e.into()),
            };

            if let Some(response) = response {
                transport.send(&response).await?;
                stats.responses += 1;
            }
        }

        debug!(lines = stats.lines, responses = stats.responses, "Input closed");
        Ok(stats)
    }
}

/// The protocol engine: probes once, then serves one transport.
pub struct McpServer {
    config: Config,
    discovery: Arc<Discovery>,
    state: EngineState,
    session: Option<Session>,
    serve_loop: Box<dyn ServeLoop>,
}

impl McpServer {
    /// Create an engine over a discovery facade.
    pub fn new(discovery: Arc<Discovery>, config: Config) -> Self {
        Self {
            config,
            discovery,
            state: EngineState::Uninitialized,
            session: None,
            serve_loop: Box::new(SequentialLoop),
        }
    }

    /// Replace the serve loop.
    pub fn with_serve_loop(mut self, serve_loop: impl ServeLoop + 'static) -> Self {
        self.serve_loop = Box::new(serve_loop);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The session, once probing has completed.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Probe the source and fix the tool surface for this engine.
    pub async fn start(&mut self) -> Result<EngineState, McpError> {
        if self.state != EngineState::Uninitialized {
            return Err(McpError::invalid_state(
                EngineState::Uninitialized.to_string(),
                self.state.to_string(),
            ));
        }

        self.state = EngineState::Probing;
        info!(source = self.discovery.source().name(), "Probing capability source");

        let session = Session::start(Arc::clone(&self.discovery), &self.config).await;
        self.state = match session.surface().mode {
            SurfaceMode::Fallback => EngineState::Degraded,
            mode => EngineState::Ready(mode),
        };
        self.session = Some(session);

        info!(state = %self.state, "Engine started");
        Ok(self.state)
    }

    /// Serve requests from `transport` until its input closes.
    ///
    /// Probes first if [`start`](Self::start) has not been called.
    pub async fn serve<T: Transport>(&mut self, transport: &mut T) -> Result<ServeStats, McpError> {
        if self.state == EngineState::Uninitialized {
            self.start().await?;
        }

        let session = match (self.state, self.session.as_ref()) {
            (EngineState::Ready(_) | EngineState::Degraded, Some(session)) => session,
            _ => {
                return Err(McpError::invalid_state("ready or degraded", self.state.to_string()));
            }
        };

        self.state = EngineState::Serving;
        info!(tools = session.surface().registry.len(), "Serving requests");

        let result = self.serve_loop.run(session, transport).await;
        if let Err(e) = transport.close().await {
            warn!(error = %e, "Failed to close transport");
        }
        self.state = EngineState::Terminated;

        match &result {
            Ok(stats) => info!(responses = stats.responses, "Session terminated"),
            Err(e) => info!(error = %e, "Session terminated with error"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JsonRpcError;
    use crate::transport::LineTransport;
    use billbridge_source::CatalogSource;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    /// Accepts writes but cannot flush.
    struct BrokenPipe;

    impl tokio::io::AsyncWrite for BrokenPipe {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn server(source: CatalogSource) -> McpServer {
        let discovery = Arc::new(Discovery::new(Arc::new(source), Duration::from_secs(300)));
        McpServer::new(discovery, Config::default())
    }

    #[tokio::test]
    async fn test_start_transitions() {
        let mut engine = server(CatalogSource::with_methods(["GetClients"]));
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.session().is_none());

        let state = engine.start().await.unwrap();
        assert_eq!(state, EngineState::Ready(SurfaceMode::Direct));

        // Probing happens once
        assert!(matches!(
            engine.start().await,
            Err(McpError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_source_degrades() {
        let mut engine = server(CatalogSource::with_methods(["GetClients"]).disconnected());
        assert_eq!(engine.start().await.unwrap(), EngineState::Degraded);
        assert_eq!(engine.session().unwrap().surface().registry.len(), 2);
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        let mut engine = server(CatalogSource::with_methods(["GetClients"]));
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n\
            {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\
            {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut transport = LineTransport::new(input, Vec::new());

        let stats = engine.serve(&mut transport).await.unwrap();
        assert_eq!(stats, ServeStats { lines: 4, responses: 3 });
        assert_eq!(engine.state(), EngineState::Terminated);

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let codes: Vec<String> = output
            .lines()
            .map(|line| {
                let response: serde_json::Value = serde_json::from_str(line).unwrap();
                response["error"]["code"].to_string()
            })
            .collect();
        // The blank line is answered with a parse error
        assert_eq!(codes, vec!["null", "-32700", "null"]);

        // A terminated engine does not serve again
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());
        assert!(engine.serve(&mut transport).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_never_invoked() {
        let source = Arc::new(CatalogSource::with_methods(["GetClients"]));
        let discovery = Arc::new(Discovery::new(source.clone(), Duration::from_secs(300)));
        let mut engine = McpServer::new(discovery, Config::default());

        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\
            \"params\":{\"name\":\"billing_getclients\",\"arguments\":{\"email\":\"a\xffb\"}}}\n\
            {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut transport = LineTransport::new(input, Vec::new());

        let stats = engine.serve(&mut transport).await.unwrap();
        assert_eq!(stats, ServeStats { lines: 2, responses: 2 });
        assert!(source.invocations().is_empty());

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let responses: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses[0]["id"], serde_json::Value::Null);
        assert_eq!(responses[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[1]["id"], 2);
        assert!(responses[1]["result"].is_object());
    }

    #[tokio::test]
    async fn test_close_failure_still_terminates() {
        let mut engine = server(CatalogSource::with_methods(["GetClients"]));
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, BrokenPipe);

        let stats = engine.serve(&mut transport).await.unwrap();
        assert_eq!(stats, ServeStats::default());
        assert_eq!(engine.state(), EngineState::Terminated);
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(EngineState::Ready(SurfaceMode::Meta).to_string(), "ready (meta)");
        assert_eq!(EngineState::Degraded.to_string(), "degraded");
    }
}
