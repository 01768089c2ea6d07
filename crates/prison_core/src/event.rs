//! Typed session events produced by the protocol client.

use crate::participant::{Participant, ParticipantId};

/// Something that happened on the connection, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport opened and the identification line was queued.
    Connected,
    /// Transport closed, failed to open, or was dropped on purpose.
    Disconnected,
    /// Server accepted the handshake.
    Authenticated,
    /// Server confirmed a planet join.
    PlanetJoined,
    /// Another participant is present on the planet.
    UserJoin(Participant),
    /// A participant left or went to sleep.
    UserPart(ParticipantId),
    /// Someone other than us was hit by an offensive action; carries the id
    /// the server reported for the action.
    EnemyAction(ParticipantId),
    /// The round-trip allowance after our own action elapsed.
    AfterAction,
    /// Free-text line for the collaborator's log console.
    Log(String),
}

impl SessionEvent {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Authenticated => "authenticated",
            Self::PlanetJoined => "planet_joined",
            Self::UserJoin(_) => "user_join",
            Self::UserPart(_) => "user_part",
            Self::EnemyAction(_) => "enemy_action",
            Self::AfterAction => "after_action",
            Self::Log(_) => "log",
        }
    }
}
