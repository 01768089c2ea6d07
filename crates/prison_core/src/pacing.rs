//! Adaptive aggression multiplier.
//!
//! The gap between consecutive settlements approximates how fast the server
//! is processing our actions. Fast settlements make the bot back off, slow
//! ones let it push harder.

use rand::Rng;

use crate::settings::{IntervalBounds, MAX_INTERVAL_MS};
use crate::timing::{Millis, COOLDOWN_BASE_MS, COOLDOWN_SPREAD_MS};

/// Lowest aggression multiplier.
pub const AGGRESSION_MIN: f64 = 0.7;

/// Highest aggression multiplier.
pub const AGGRESSION_MAX: f64 = 1.4;

/// Adjustment per settlement.
pub const AGGRESSION_STEP: f64 = 0.1;

/// Settlement gaps shorter than this lower aggression.
pub const FAST_GAP_MS: Millis = 2500;

/// Settlement gaps longer than this raise aggression.
pub const SLOW_GAP_MS: Millis = 6000;

/// Floor on the attack delay after scaling.
pub const MIN_ATTACK_DELAY_MS: f64 = 600.0;

/// Aggression state carried across settlements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    aggression: f64,
    last_settled_at: Option<Millis>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            aggression: 1.0,
            last_settled_at: None,
        }
    }
}

impl Pacing {
    /// Neutral pacing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current multiplier in `[AGGRESSION_MIN, AGGRESSION_MAX]`.
    #[must_use]
    pub const fn aggression(&self) -> f64 {
        self.aggression
    }

    /// Time of the previous settlement.
    #[must_use]
    pub const fn last_settled_at(&self) -> Option<Millis> {
        self.last_settled_at
    }

    /// Record a settlement and adapt the multiplier to the gap since the
    /// previous one. The first settlement only records its time.
    pub fn settle(&mut self, now: Millis) -> f64 {
        if let Some(previous) = self.last_settled_at {
            let gap = now.saturating_sub(previous);
            if gap < FAST_GAP_MS {
                self.aggression = (self.aggression - AGGRESSION_STEP).max(AGGRESSION_MIN);
            } else if gap > SLOW_GAP_MS {
                self.aggression = (self.aggression + AGGRESSION_STEP).min(AGGRESSION_MAX);
            }
        }
        self.last_settled_at = Some(now);
        self.aggression
    }

    /// Draw an attack delay: sampled interval divided by aggression.
    pub fn attack_delay<R: Rng + ?Sized>(&self, bounds: &IntervalBounds, rng: &mut R) -> Millis {
        let scaled = bounds.sample(rng) / self.aggression;
        scaled
            .clamp(MIN_ATTACK_DELAY_MS, MAX_INTERVAL_MS)
            .round() as Millis
    }
}

/// Deadline before which no new action may start after a settlement.
pub fn cooldown_deadline<R: Rng + ?Sized>(now: Millis, rng: &mut R) -> Millis {
    now.saturating_add(COOLDOWN_BASE_MS + rng.gen_range(0..COOLDOWN_SPREAD_MS))
}
