//! Collaborator-supplied settings and interval pacing.
//!
//! Settings arrive wholesale from the collaborator and are never mutated by
//! the engine. Interval bounds travel as text exactly as typed by the user;
//! anything that does not parse as a finite number is read as 0 so a bad
//! value degrades pacing instead of stopping the loop.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::timing::Millis;

/// Floor applied to every sampled interval.
pub const MIN_INTERVAL_MS: f64 = 400.0;

/// Ceiling applied to every sampled interval and to the idle reconnect delay.
pub const MAX_INTERVAL_MS: f64 = 3_600_000.0;

/// Bot settings as edited by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target everyone regardless of filters.
    pub prison_all: bool,
    /// Leave (reconnect) when the last target departs.
    pub user_part: bool,
    /// Re-arm the join-grace window on every planet join.
    pub timeout_3sec: bool,
    /// Run a reconnect cycle after every settled action.
    pub disconnect_action: bool,
    /// Allow reconnect cycles and the idle reconnect.
    pub reconnect: bool,
    /// Counter-attack whoever acts against us.
    pub stand_on_enemy: bool,
    /// Disconnect and halt after the first settled action.
    pub prison_and_off: bool,
    /// Re-join the last planet after every authentication.
    pub re_fly_join: bool,
    /// Idle reconnect delay in ms, applied by the worker.
    pub timer_reconnect: String,
    /// Lower attack interval bound in ms.
    pub attack_min: String,
    /// Upper attack interval bound in ms.
    pub attack_max: String,
    /// Attack jitter in ms for symmetric pacing.
    pub attack_plus_minus: String,
    /// Lower defense interval bound in ms.
    pub defense_min: String,
    /// Upper defense interval bound in ms.
    pub defense_max: String,
    /// Defense jitter in ms for symmetric pacing.
    pub defense_plus_minus: String,
    /// Use symmetric `base ± jitter` pacing for attacks.
    pub pm_tm_a: bool,
    /// Use symmetric `base ± jitter` pacing for defense.
    pub pm_tm_z: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prison_all: true,
            user_part: true,
            timeout_3sec: true,
            disconnect_action: false,
            reconnect: true,
            stand_on_enemy: false,
            prison_and_off: false,
            re_fly_join: false,
            timer_reconnect: "0".to_string(),
            attack_min: "1700".to_string(),
            attack_max: "2000".to_string(),
            attack_plus_minus: "5".to_string(),
            defense_min: "1600".to_string(),
            defense_max: "1600".to_string(),
            defense_plus_minus: "5".to_string(),
            pm_tm_a: false,
            pm_tm_z: false,
        }
    }
}

impl Settings {
    /// Attack interval bounds.
    #[must_use]
    pub fn attack_bounds(&self) -> IntervalBounds {
        IntervalBounds::parse(
            &self.attack_min,
            &self.attack_max,
            &self.attack_plus_minus,
            self.pm_tm_a,
        )
    }

    /// Defense interval bounds.
    #[must_use]
    pub fn defense_bounds(&self) -> IntervalBounds {
        IntervalBounds::parse(
            &self.defense_min,
            &self.defense_max,
            &self.defense_plus_minus,
            self.pm_tm_z,
        )
    }

    /// Idle reconnect delay. Zero disables the idle reconnect.
    #[must_use]
    pub fn idle_reconnect_delay(&self) -> Millis {
        coerce_ms(&self.timer_reconnect).clamp(0.0, MAX_INTERVAL_MS) as Millis
    }
}

/// Parsed interval bounds in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalBounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Jitter around the midpoint for symmetric pacing.
    pub plus_minus: f64,
    /// Sample `midpoint ± plus_minus` instead of `[min, max]`.
    pub symmetric: bool,
}

impl IntervalBounds {
    /// Parse bounds from user text, coercing bad values to 0.
    #[must_use]
    pub fn parse(min: &str, max: &str, plus_minus: &str, symmetric: bool) -> Self {
        Self {
            min: coerce_ms(min),
            max: coerce_ms(max),
            plus_minus: coerce_ms(plus_minus),
            symmetric,
        }
    }

    /// Draw one interval, clamped to [`MIN_INTERVAL_MS`]..=[`MAX_INTERVAL_MS`].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let unit: f64 = rng.gen();
        let raw = if self.symmetric {
            let base = self.min / 2.0 + self.max / 2.0;
            base + (unit * 2.0 - 1.0) * self.plus_minus
        } else {
            self.min + unit * (self.max - self.min)
        };
        if raw.is_nan() {
            return MIN_INTERVAL_MS;
        }
        raw.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
    }
}

/// Read a user-typed millisecond value. Anything non-numeric is 0.
#[must_use]
pub fn coerce_ms(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_coerce_non_numeric_to_zero() {
        assert_eq!(coerce_ms("1500"), 1500.0);
        assert_eq!(coerce_ms(" 250 "), 250.0);
        assert_eq!(coerce_ms("abc"), 0.0);
        assert_eq!(coerce_ms(""), 0.0);
        assert_eq!(coerce_ms("NaN"), 0.0);
        assert_eq!(coerce_ms("inf"), 0.0);
    }

    #[test]
    fn test_uniform_sample_stays_in_bounds() {
        let bounds = IntervalBounds::parse("1700", "2000", "5", false);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let value = bounds.sample(&mut rng);
            assert!((1700.0..2000.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn test_symmetric_sample_centres_on_midpoint() {
        let bounds = IntervalBounds::parse("1000", "2000", "100", true);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let value = bounds.sample(&mut rng);
            assert!((1400.0..=1600.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn test_garbage_bounds_hit_the_floor() {
        let bounds = IntervalBounds::parse("fast", "", "x", false);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(bounds.sample(&mut rng), MIN_INTERVAL_MS);
    }

    #[test]
    fn test_idle_reconnect_delay() {
        let mut settings = Settings::default();
        assert_eq!(settings.idle_reconnect_delay(), 0);
        settings.timer_reconnect = "4500".to_string();
        assert_eq!(settings.idle_reconnect_delay(), 4500);
        settings.timer_reconnect = "-10".to_string();
        assert_eq!(settings.idle_reconnect_delay(), 0);
        settings.timer_reconnect = "1e19".to_string();
        assert_eq!(settings.idle_reconnect_delay(), MAX_INTERVAL_MS as Millis);
    }

    #[test]
    fn test_huge_bounds_hit_the_ceiling() {
        let mut rng = SmallRng::seed_from_u64(3);
        let uniform = IntervalBounds::parse("1e20", "1e20", "5", false);
        assert_eq!(uniform.sample(&mut rng), MAX_INTERVAL_MS);
        let symmetric = IntervalBounds::parse("1e300", "1e300", "1e300", true);
        for _ in 0..50 {
            let value = symmetric.sample(&mut rng);
            assert!((MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&value), "{value}");
        }
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let settings: Settings =
            ron::from_str(r#"(prison_all: false, attack_min: "900")"#).unwrap();
        assert!(!settings.prison_all);
        assert_eq!(settings.attack_bounds().min, 900.0);
        assert_eq!(settings.attack_max, Settings::default().attack_max);
        assert!(settings.reconnect);
    }
}
