//! Participant identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timing::Millis;

/// Server-assigned participant id, unique within a planet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a raw id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ParticipantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ParticipantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Another actor seen on the current planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant id.
    pub id: ParticipantId,
    /// Display nick.
    pub nick: String,
    /// Clan tag, empty when the participant has none.
    pub clan: String,
    /// When the participant was first seen. Stamped by the roster.
    pub joined_at: Millis,
}

impl Participant {
    /// Create a participant that has not been stamped by a roster yet.
    #[must_use]
    pub fn new(
        id: impl Into<ParticipantId>,
        nick: impl Into<String>,
        clan: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            nick: nick.into(),
            clan: clan.into(),
            joined_at: 0,
        }
    }
}
