//! Enemy profiles and danger scoring.
//!
//! Every observed offensive action raises the actor's danger score. Profiles
//! that have been quiet for longer than [`HOSTILITY_WINDOW_MS`] start over on
//! their next hit, which is how danger decays.

use std::collections::HashMap;

use crate::participant::ParticipantId;
use crate::timing::{Millis, HOSTILITY_WINDOW_MS};

/// Danger added per observed hit.
pub const DANGER_STEP: u32 = 15;

/// Danger ceiling.
pub const DANGER_CAP: u32 = 100;

/// Danger at which an enemy is queued with [`HIGH_THREAT_PRIORITY`].
pub const DANGER_THRESHOLD: u32 = 60;

/// Queue priority for enemies below the danger threshold.
pub const THREAT_PRIORITY: u32 = 2;

/// Queue priority for enemies at or above the danger threshold.
pub const HIGH_THREAT_PRIORITY: u32 = 3;

/// Accumulated hostility of one enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyProfile {
    /// Hits observed inside the current window.
    pub hits: u32,
    /// Last observed hit.
    pub last_seen: Millis,
    /// Danger score in `0..=DANGER_CAP`.
    pub danger: u32,
}

impl EnemyProfile {
    /// Queue priority this profile earns.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        if self.danger >= DANGER_THRESHOLD {
            HIGH_THREAT_PRIORITY
        } else {
            THREAT_PRIORITY
        }
    }

    /// Whether the profile is still inside the hostility window.
    #[must_use]
    pub const fn is_active(&self, now: Millis) -> bool {
        now.saturating_sub(self.last_seen) < HOSTILITY_WINDOW_MS
    }
}

/// Profiles for every enemy seen this run.
#[derive(Debug, Clone, Default)]
pub struct EnemyTracker {
    profiles: HashMap<ParticipantId, EnemyProfile>,
}

impl EnemyTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one offensive action by `id` and return the updated profile.
    /// Profiles gone quiet are dropped.
    pub fn record_hit(&mut self, id: &ParticipantId, now: Millis) -> EnemyProfile {
        self.profiles.retain(|_, profile| profile.is_active(now));
        let profile = self
            .profiles
            .entry(id.clone())
            .or_insert(EnemyProfile {
                hits: 0,
                last_seen: now,
                danger: 0,
            });

        if !profile.is_active(now) {
            profile.hits = 0;
            profile.danger = 0;
        }

        profile.hits += 1;
        profile.last_seen = now;
        profile.danger = (profile.danger + DANGER_STEP).min(DANGER_CAP);
        *profile
    }

    /// Profile for an enemy seen since the last prune.
    #[must_use]
    pub fn profile(&self, id: &ParticipantId) -> Option<&EnemyProfile> {
        self.profiles.get(id)
    }

    /// Whether the id has hit us inside the hostility window.
    #[must_use]
    pub fn is_hostile(&self, id: &ParticipantId, now: Millis) -> bool {
        self.profiles
            .get(id)
            .is_some_and(|profile| profile.is_active(now))
    }

    /// Enemies active inside the window, most hits first.
    #[must_use]
    pub fn hostiles(&self, now: Millis) -> Vec<ParticipantId> {
        let mut active: Vec<(&ParticipantId, &EnemyProfile)> = self
            .profiles
            .iter()
            .filter(|(_, profile)| profile.is_active(now))
            .collect();
        active.sort_by(|(a, pa), (b, pb)| pb.hits.cmp(&pa.hits).then_with(|| a.cmp(b)));
        active.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Forget everyone.
    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    #[test]
    fn test_danger_steps_and_caps() {
        let mut tracker = EnemyTracker::new();
        let mut last = None;
        for i in 0..10 {
            last = Some(tracker.record_hit(&id("x"), i * 1000));
        }
        let profile = last.unwrap();
        assert_eq!(profile.hits, 10);
        assert_eq!(profile.danger, DANGER_CAP);
    }

    #[test]
    fn test_priority_rises_at_threshold() {
        let mut tracker = EnemyTracker::new();
        let mut profile = tracker.record_hit(&id("x"), 0);
        assert_eq!(profile.priority(), THREAT_PRIORITY);
        for t in 1..4 {
            profile = tracker.record_hit(&id("x"), t);
        }
        assert_eq!(profile.danger, 60);
        assert_eq!(profile.priority(), HIGH_THREAT_PRIORITY);
    }

    #[test]
    fn test_quiet_profile_resets_on_next_hit() {
        let mut tracker = EnemyTracker::new();
        tracker.record_hit(&id("x"), 0);
        tracker.record_hit(&id("x"), 10);

        let profile = tracker.record_hit(&id("x"), 10 + HOSTILITY_WINDOW_MS);
        assert_eq!(profile.hits, 1);
        assert_eq!(profile.danger, DANGER_STEP);
    }

    #[test]
    fn test_quiet_profiles_pruned_on_next_hit() {
        let mut tracker = EnemyTracker::new();
        tracker.record_hit(&id("old"), 0);
        tracker.record_hit(&id("new"), HOSTILITY_WINDOW_MS / 2);
        assert!(tracker.profile(&id("old")).is_some());

        tracker.record_hit(&id("new"), HOSTILITY_WINDOW_MS + 1);
        assert!(tracker.profile(&id("old")).is_none());
        assert_eq!(tracker.profile(&id("new")).unwrap().hits, 2);
    }

    #[test]
    fn test_hostiles_sorted_by_hits_inside_window() {
        let mut tracker = EnemyTracker::new();
        tracker.record_hit(&id("old"), 0);
        tracker.record_hit(&id("one"), 50_000);
        tracker.record_hit(&id("two"), 50_000);
        tracker.record_hit(&id("two"), 51_000);

        assert_eq!(tracker.hostiles(70_000), vec![id("two"), id("one")]);
        assert!(!tracker.is_hostile(&id("old"), 70_000));
    }
}
