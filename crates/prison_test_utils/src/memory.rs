//! In-memory transport.
//!
//! [`MemoryConnector`] hands every successful connection's server half to a
//! [`MemoryServer`], where the test plays the remote end through a
//! [`MemoryPeer`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use prison_client::error::TransportError;
use prison_client::protocol::LINE_TERMINATOR;
use prison_client::transport::{Connector, Transport};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Client half of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: UnboundedReceiver<String>,
    outbound: Option<UnboundedSender<String>>,
}

impl Transport for MemoryTransport {
    async fn send_line(&mut self, line: String) -> Result<(), TransportError> {
        let sender = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        sender.send(line).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.outbound.as_ref()?;
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound = None;
        self.inbound.close();
        Ok(())
    }
}

/// Server half of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    to_client: Option<UnboundedSender<String>>,
    from_client: UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Endpoint the client dialled.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send raw text to the client. Returns `false` once either side closed.
    pub fn send(&self, data: &str) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|sender| sender.send(data.to_string()).is_ok())
    }

    /// Send one line, adding the terminator.
    pub fn send_line(&self, line: &str) -> bool {
        self.send(&format!("{line}{LINE_TERMINATOR}"))
    }

    /// Next line the client wrote, without its terminator. `None` once the
    /// client closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.from_client
            .recv()
            .await
            .map(|line| line.trim_end_matches(LINE_TERMINATOR).to_string())
    }

    /// Wait for a line with the given prefix, skipping others.
    pub async fn expect_prefix(&mut self, prefix: &str) -> Option<String> {
        while let Some(line) = self.next_line().await {
            if line.starts_with(prefix) {
                return Some(line);
            }
            debug!(%line, prefix, "skipping line");
        }
        None
    }

    /// Play the server side of the handshake: challenge, registration and
    /// authentication, with `self_id` as the client's id.
    pub async fn handshake(&mut self, seed: &str, self_id: &str) -> bool {
        self.expect_prefix(":ru IDENT").await.is_some()
            && self.send_line(&format!("HAAAPSI {seed}"))
            && self.expect_prefix("RECOVER").await.is_some()
            && self.send_line(&format!("REGISTER {self_id} guest x"))
            && self.expect_prefix("USER").await.is_some()
            && self.send_line("999")
    }

    /// Close the server side.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }
}

/// Receives the server half of each accepted connection.
#[derive(Debug)]
pub struct MemoryServer {
    peers: UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Next accepted connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

/// Connector producing [`MemoryTransport`]s.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: UnboundedSender<MemoryPeer>,
    refusals: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// New connector and the server that sees its connections.
    #[must_use]
    pub fn new() -> (Self, MemoryServer) {
        let (peers, accepted) = mpsc::unbounded_channel();
        (
            Self {
                peers,
                refusals: Arc::new(AtomicUsize::new(0)),
                attempts: Arc::new(AtomicUsize::new(0)),
            },
            MemoryServer { peers: accepted },
        )
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.refusals.store(n, Ordering::SeqCst);
    }

    /// Connection attempts so far, refused ones included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, url: &str) -> Result<MemoryTransport, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Open {
                url: url.to_string(),
                reason: "refused".to_string(),
            });
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.to_string(),
            to_client: Some(to_client),
            from_client,
        };
        self.peers.send(peer).map_err(|_| TransportError::Open {
            url: url.to_string(),
            reason: "server gone".to_string(),
        })?;

        Ok(MemoryTransport {
            inbound,
            outbound: Some(outbound),
        })
    }
}
