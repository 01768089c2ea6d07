//! Target metadata and the ranked target queue.
//!
//! The queue is recomputed synchronously after every mutation, so a read
//! never observes a ranking older than the last add or remove. Ranking is
//! priority descending, then last-seen ascending (the target seen longest
//! ago goes first among equals), then id for a total order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::participant::ParticipantId;
use crate::timing::Millis;

/// Per-target ranking data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMeta {
    /// Ranking priority. Starts at the requested value, +1 per repeat add.
    pub priority: u32,
    /// Last time the target was added or bumped.
    pub last_seen: Millis,
}

/// Tracked targets plus their derived ordering and rotation cursor.
#[derive(Debug, Clone, Default)]
pub struct TargetQueue {
    meta: HashMap<ParticipantId, TargetMeta>,
    ranked: Vec<ParticipantId>,
    cursor: usize,
}

impl TargetQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target, or bump its priority by one if already tracked.
    ///
    /// Returns `true` when the id was not tracked before.
    pub fn add(&mut self, id: ParticipantId, priority: u32, now: Millis) -> bool {
        let inserted = match self.meta.get_mut(&id) {
            Some(meta) => {
                meta.priority = meta.priority.saturating_add(1);
                meta.last_seen = now;
                false
            }
            None => {
                self.meta.insert(
                    id,
                    TargetMeta {
                        priority,
                        last_seen: now,
                    },
                );
                true
            }
        };
        self.rebuild();
        inserted
    }

    /// Stop tracking a target. Returns its metadata if it was tracked.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<TargetMeta> {
        let removed = self.meta.remove(id);
        if removed.is_some() {
            self.rebuild();
        }
        removed
    }

    /// Drop every target and reset the rotation.
    pub fn clear(&mut self) {
        self.meta.clear();
        self.ranked.clear();
        self.cursor = 0;
    }

    /// Target at the current rotation offset.
    #[must_use]
    pub fn current(&self) -> Option<&ParticipantId> {
        self.ranked.get(self.cursor)
    }

    /// Advance the rotation offset to the next ranked entry, wrapping.
    pub fn rotate(&mut self) {
        if self.ranked.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.ranked.len();
    }

    /// Ranked ids, highest priority first.
    #[must_use]
    pub fn ids(&self) -> &[ParticipantId] {
        &self.ranked
    }

    /// Ranked ids with their metadata.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &TargetMeta)> {
        self.ranked
            .iter()
            .filter_map(|id| self.meta.get(id).map(|meta| (id, meta)))
    }

    /// Metadata for a tracked target.
    #[must_use]
    pub fn meta(&self, id: &ParticipantId) -> Option<&TargetMeta> {
        self.meta.get(id)
    }

    /// Whether the id is tracked.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.meta.contains_key(id)
    }

    /// Current rotation offset.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of tracked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// Whether no target is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    fn rebuild(&mut self) {
        let mut ranked: Vec<ParticipantId> = self.meta.keys().cloned().collect();
        ranked.sort_by(|a, b| rank(a, &self.meta[a], b, &self.meta[b]));
        self.ranked = ranked;

        if self.cursor >= self.ranked.len() {
            self.cursor = 0;
        }
    }
}

fn rank(a: &ParticipantId, ma: &TargetMeta, b: &ParticipantId, mb: &TargetMeta) -> Ordering {
    mb.priority
        .cmp(&ma.priority)
        .then(ma.last_seen.cmp(&mb.last_seen))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    #[test]
    fn test_priority_descending_then_oldest_first() {
        let mut queue = TargetQueue::new();
        queue.add(id("late"), 1, 300);
        queue.add(id("early"), 1, 100);
        queue.add(id("boss"), 3, 200);

        assert_eq!(queue.ids(), &[id("boss"), id("early"), id("late")]);
    }

    #[test]
    fn test_repeat_add_bumps_priority() {
        let mut queue = TargetQueue::new();
        assert!(queue.add(id("a"), 1, 0));
        assert!(!queue.add(id("a"), 1, 50));

        let meta = queue.meta(&id("a")).unwrap();
        assert_eq!(meta.priority, 2);
        assert_eq!(meta.last_seen, 50);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_rotation_moves_to_next_entry() {
        let mut queue = TargetQueue::new();
        queue.add(id("A"), 2, 0);
        queue.add(id("B"), 1, 0);

        assert_eq!(queue.current(), Some(&id("A")));
        queue.rotate();
        assert_eq!(queue.current(), Some(&id("B")));
        queue.rotate();
        assert_eq!(queue.current(), Some(&id("A")));
    }

    #[test]
    fn test_remove_resets_out_of_range_cursor() {
        let mut queue = TargetQueue::new();
        queue.add(id("A"), 2, 0);
        queue.add(id("B"), 1, 0);
        queue.rotate();

        queue.remove(&id("B"));
        assert_eq!(queue.cursor(), 0);
        assert_eq!(queue.current(), Some(&id("A")));
    }

    #[test]
    fn test_empty_queue_has_no_current_target() {
        let mut queue = TargetQueue::new();
        queue.rotate();
        assert!(queue.current().is_none());
        assert!(queue.remove(&id("ghost")).is_none());
    }
}
