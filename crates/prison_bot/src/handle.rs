//! Message-passing surface between the collaborator and the worker.
//!
//! The collaborator never touches engine or client state. Commands go in
//! through a [`BotHandle`]; log lines and status flags come back as
//! [`BotUpdate`]s on the update channel.

use prison_core::engine::BotState;
use prison_core::filters::FilterLists;
use prison_core::participant::ParticipantId;
use prison_core::settings::Settings;
use prison_core::timing::Millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// The worker task has gone away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// Worker stopped; the handle is useless from here on.
    #[error("bot worker has stopped")]
    Stopped,
}

/// Command from the collaborator.
#[derive(Debug)]
pub enum UiCommand {
    /// Connect with a recovery code.
    Connect(String),
    /// Drop the connection.
    Disconnect,
    /// Arm the bot.
    Start,
    /// Disarm the bot.
    Stop,
    /// Travel to a planet.
    JoinPlanet(String),
    /// Replace the settings.
    UpdateSettings(Settings),
    /// Replace the filter lists.
    UpdateFilters(FilterLists),
    /// Snapshot of the targeting state.
    Targets(oneshot::Sender<TargetReport>),
    /// Disconnect and stop the worker.
    Shutdown,
}

/// Output for the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BotUpdate {
    /// Log console line.
    Log(String),
    /// Connection flag.
    Connected(bool),
    /// Bot-armed flag.
    Armed(bool),
}

/// One queued target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    /// Participant id.
    pub id: ParticipantId,
    /// Nick, if the participant is on the roster.
    pub nick: Option<String>,
    /// Ranking priority.
    pub priority: u32,
    /// Last add or bump.
    pub last_seen: Millis,
}

/// Snapshot of the targeting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Engine state.
    pub state: BotState,
    /// Whether the transport is open.
    pub connected: bool,
    /// Target at the rotation offset.
    pub current: Option<ParticipantId>,
    /// Ranked targets.
    pub targets: Vec<TargetEntry>,
    /// Enemies active inside the hostility window.
    pub hostiles: Vec<ParticipantId>,
    /// Aggression multiplier.
    pub aggression: f64,
}

/// Cloneable handle to a running worker.
#[derive(Debug, Clone)]
pub struct BotHandle {
    commands: mpsc::UnboundedSender<UiCommand>,
}

impl BotHandle {
    /// Wrap the command sender of a worker.
    #[must_use]
    pub fn new(commands: mpsc::UnboundedSender<UiCommand>) -> Self {
        Self { commands }
    }

    /// Connect with a recovery code.
    pub fn connect(&self, recovery_code: impl Into<String>) -> Result<(), WorkerError> {
        self.send(UiCommand::Connect(recovery_code.into()))
    }

    /// Drop the connection.
    pub fn disconnect(&self) -> Result<(), WorkerError> {
        self.send(UiCommand::Disconnect)
    }

    /// Arm the bot.
    pub fn start(&self) -> Result<(), WorkerError> {
        self.send(UiCommand::Start)
    }

    /// Disarm the bot.
    pub fn stop(&self) -> Result<(), WorkerError> {
        self.send(UiCommand::Stop)
    }

    /// Travel to a planet.
    pub fn join_planet(&self, planet: impl Into<String>) -> Result<(), WorkerError> {
        self.send(UiCommand::JoinPlanet(planet.into()))
    }

    /// Replace the settings.
    pub fn update_settings(&self, settings: Settings) -> Result<(), WorkerError> {
        self.send(UiCommand::UpdateSettings(settings))
    }

    /// Replace the filter lists.
    pub fn update_filters(&self, filters: FilterLists) -> Result<(), WorkerError> {
        self.send(UiCommand::UpdateFilters(filters))
    }

    /// Snapshot of the targeting state.
    pub async fn targets(&self) -> Result<TargetReport, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.send(UiCommand::Targets(reply))?;
        response.await.map_err(|_| WorkerError::Stopped)
    }

    /// Disconnect and stop the worker.
    pub fn shutdown(&self) -> Result<(), WorkerError> {
        self.send(UiCommand::Shutdown)
    }

    fn send(&self, command: UiCommand) -> Result<(), WorkerError> {
        self.commands.send(command).map_err(|_| WorkerError::Stopped)
    }
}
