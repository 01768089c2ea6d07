//! # Prison Core
//!
//! Deterministic decision engine for the planet prison bot.
//!
//! This crate contains **only** decision logic:
//! - No IO (the protocol client lives in `prison_client`)
//! - No wall clock (every operation takes the current time as [`Millis`])
//! - No system randomness (pacing jitter comes from a seeded `SmallRng`)
//!
//! This separation enables:
//! - Driving the engine from a single async worker or from a test harness
//! - Reproducing any pacing decision from a seed
//! - Property testing of the scheduling invariants
//!
//! ## Crate Structure
//!
//! - [`engine`] - Bot state machine, action loop and reconnect cycle
//! - [`targets`] - Target metadata and the ranked target queue
//! - [`roster`] - Participants currently present on the planet
//! - [`filters`] - Blacklist/whitelist matching
//! - [`settings`] - Collaborator-supplied settings and interval pacing
//! - [`enemy`] - Enemy profiles and danger scoring
//! - [`pacing`] - Adaptive aggression multiplier
//! - [`event`] - Typed session events consumed by the engine

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod engine;
pub mod enemy;
pub mod event;
pub mod filters;
pub mod pacing;
pub mod participant;
pub mod roster;
pub mod settings;
pub mod targets;
pub mod timing;

pub use timing::Millis;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::engine::{BotState, Directive, Engine, TimerKind};
    pub use crate::enemy::{EnemyProfile, EnemyTracker};
    pub use crate::event::SessionEvent;
    pub use crate::filters::FilterLists;
    pub use crate::pacing::Pacing;
    pub use crate::participant::{Participant, ParticipantId};
    pub use crate::roster::Roster;
    pub use crate::settings::{IntervalBounds, Settings};
    pub use crate::targets::{TargetMeta, TargetQueue};
    pub use crate::timing::Millis;
}
