//! Line-delimited transport.
//!
//! One JSON message per line in each direction. The engine serves over
//! stdin/stdout; tests drive it over in-memory streams.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::debug;

use crate::error::TransportError;

/// Trait for MCP transport implementations.
#[async_trait]
pub trait Transport: Send {
    /// Send one message.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Receive the next message.
    ///
    /// Returns [`TransportError::ConnectionClosed`] at end of input and
    /// [`TransportError::InvalidUtf8`] for a line that is not UTF-8.
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// Close the transport.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the transport is connected.
    fn is_connected(&self) -> bool;
}

/// Newline-delimited transport over any async reader and writer.
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    connected: bool,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            connected: true,
        }
    }

    /// Give back the writer, e.g. to inspect captured output.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl LineTransport<Stdin, Stdout> {
    /// Transport over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        self.writer
            .write_all(message.as_bytes())
            .await
            .map_err(TransportError::WriteError)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(TransportError::WriteError)?;
        self.writer.flush().await.map_err(TransportError::WriteError)?;

        Ok(())
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let mut buf = Vec::new();
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(TransportError::ReadError)?;

        if bytes_read == 0 {
            self.connected = false;
            return Err(TransportError::ConnectionClosed);
        }

        debug!(bytes = bytes_read, "Received line");
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }

        String::from_utf8(buf).map_err(TransportError::InvalidUtf8)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Input may already be closed; pending output still needs flushing
        self.connected = false;
        self.writer.flush().await.map_err(TransportError::WriteError)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
