//! Async transport seam.
//!
//! The worker only needs three things from a connection: write a line, read
//! the next chunk of text, close. [`Connector`] opens connections so tests
//! can substitute an in-memory pair for the WebSocket.

use std::future::Future;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::TransportError;

/// An open, full-duplex text connection.
pub trait Transport: Send {
    /// Write one already-terminated line.
    fn send_line(&mut self, line: String)
        -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next chunk of received text. `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the worker races it against timers.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Opens transports to an endpoint.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Dial the endpoint.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport. Each outbound line is one text frame.
#[derive(Debug)]
pub struct WsTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl Transport for WsTransport {
    async fn send_line(&mut self, line: String) -> Result<(), TransportError> {
        trace!(len = line.len(), "ws send");
        self.sink
            .send(Message::Text(line))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };
            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(bytes) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Message::Close(frame) => {
                    debug!(?frame, "ws close frame");
                    return None;
                }
                // Control frames are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Opens [`WsTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, TransportError> {
        let (stream, response) = connect_async(url).await.map_err(|e| TransportError::Open {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(status = %response.status(), "ws handshake complete");
        let (sink, stream) = stream.split();
        Ok(WsTransport { sink, stream })
    }
}
