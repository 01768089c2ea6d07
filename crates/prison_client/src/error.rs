//! Transport error types.

use thiserror::Error;

/// Failure while moving lines over the transport.
///
/// Every variant is resolved the same way by the owner: a full disconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("failed to open {url}: {reason}")]
    Open {
        /// Endpoint that was dialled.
        url: String,
        /// Underlying cause.
        reason: String,
    },

    /// A line could not be written.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading from the connection failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The connection is already closed.
    #[error("transport closed")]
    Closed,
}
