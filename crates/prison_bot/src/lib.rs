//! # Prison Bot
//!
//! Async runtime around the decision engine and the protocol client.
//!
//! A single tokio task (the [`worker::Worker`]) owns the engine, the client
//! and the transport. The collaborator talks to it only through a
//! [`handle::BotHandle`] and reads [`handle::BotUpdate`]s back.
//!
//! ## Crate Structure
//!
//! - [`config`] - RON configuration
//! - [`handle`] - Command handle and update types
//! - [`worker`] - The event loop
//! - [`console`] - Line commands for the interactive binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod console;
pub mod handle;
pub mod worker;

use prison_client::transport::Connector;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::config::BotConfig;
use crate::handle::{BotHandle, BotUpdate};
use crate::worker::Worker;

/// Spawn a worker on the current runtime.
///
/// Returns the command handle, the update stream and the task handle. The
/// worker stops on [`BotHandle::shutdown`] or once every handle is dropped.
pub fn spawn<C>(
    config: BotConfig,
    connector: C,
) -> (BotHandle, UnboundedReceiver<BotUpdate>, JoinHandle<()>)
where
    C: Connector + 'static,
    C::Transport: 'static,
{
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (update_tx, updates) = mpsc::unbounded_channel();
    let worker = Worker::new(config, connector, command_rx, update_tx);
    let task = tokio::spawn(worker.run());
    (BotHandle::new(commands), updates, task)
}
