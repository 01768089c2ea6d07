//! # Prison Client
//!
//! Client for the planet chat server's line protocol.
//!
//! The protocol state machine ([`client::ProtocolClient`]) is sans-IO: it
//! consumes raw inbound text and the current time, and produces outbound
//! lines plus typed [`SessionEvent`]s. Moving bytes is the job of a
//! [`transport::Transport`], which the bot worker owns.
//!
//! ## Crate Structure
//!
//! - [`protocol`] - Inbound/outbound line grammar
//! - [`hash`] - Challenge token strategies
//! - [`session`] - Per-connection state
//! - [`client`] - Protocol state machine
//! - [`transport`] - Async transport seam and the WebSocket implementation
//! - [`error`] - Transport errors
//!
//! [`SessionEvent`]: prison_core::event::SessionEvent

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod client;
pub mod error;
pub mod hash;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::ProtocolClient;
pub use error::TransportError;
pub use hash::{TokenAlgorithm, TokenStrategy};

/// Default server endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://cs.mobstudio.ru:6672/";
