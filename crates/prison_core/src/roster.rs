//! Participants currently present on the planet.

use std::collections::HashMap;

use crate::participant::{Participant, ParticipantId};
use crate::timing::Millis;

/// Set of known participants, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: HashMap<ParticipantId, Participant>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a join or roster-snapshot entry.
    ///
    /// A participant that is already present keeps its original join time
    /// but picks up the latest nick and clan.
    pub fn insert(&mut self, mut participant: Participant, now: Millis) {
        match self.members.get_mut(&participant.id) {
            Some(existing) => {
                existing.nick = participant.nick;
                existing.clan = participant.clan;
            }
            None => {
                participant.joined_at = now;
                self.members.insert(participant.id.clone(), participant);
            }
        }
    }

    /// Remove a participant. Returns the removed entry, if any.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.members.remove(id)
    }

    /// Forget everyone.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Look up a participant.
    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.members.get(id)
    }

    /// Check whether a participant is present.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.members.contains_key(id)
    }

    /// Iterate over present participants in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }

    /// Number of present participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nobody is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
