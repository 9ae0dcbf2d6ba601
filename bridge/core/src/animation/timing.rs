//! Timing primitives: easing curves and the fixed-tick clock

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Easing functions for excursions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// No easing (constant speed)
    Linear,

    /// `3t² − 2t³`, zero velocity at both ends
    #[default]
    Smoothstep,

    /// Cubic ease in and out
    EaseInOutCubic,
}

impl EasingFunction {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Smoothstep => t * t * (3.0 - 2.0 * t),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Largest step handed to the simulation in one tick
///
/// A stalled render thread (debugger, suspended laptop) would otherwise feed
/// one huge `dt` and skip whole excursions.
pub const MAX_TICK_DELTA: Duration = Duration::from_millis(250);

/// Fixed-rate tick clock for the render loop
#[derive(Debug)]
pub struct TickClock {
    period: Duration,
    last: Instant,
    next_deadline: Instant,
    ticks: u64,
}

impl TickClock {
    /// Clock ticking `rate_hz` times per second (clamped to 1..=240)
    #[must_use]
    pub fn new(rate_hz: u32) -> Self {
        let period = Duration::from_secs(1) / rate_hz.clamp(1, 240);
        let now = Instant::now();
        Self {
            period,
            last: now,
            next_deadline: now + period,
            ticks: 0,
        }
    }

    /// Nominal tick period
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks taken so far
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time until the next tick is due (zero if already late)
    #[must_use]
    pub fn until_next(&self) -> Duration {
        self.next_deadline.saturating_duration_since(Instant::now())
    }

    /// Mark a tick and return the elapsed time in seconds, capped at
    /// [`MAX_TICK_DELTA`]
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).min(MAX_TICK_DELTA);
        self.last = now;
        self.ticks += 1;

        self.next_deadline += self.period;
        if self.next_deadline < now {
            // Fell behind; don't try to catch up with a burst of ticks
            self.next_deadline = now + self.period;
        }

        dt.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_endpoints_and_midpoint() {
        let e = EasingFunction::Smoothstep;
        assert!((e.apply(0.0)).abs() < f32::EPSILON);
        assert!((e.apply(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((e.apply(0.5) - 0.5).abs() < f32::EPSILON);
        assert!((e.apply(0.25) - 0.156_25).abs() < 1e-6);
    }

    #[test]
    fn test_apply_clamps_progress() {
        for easing in [
            EasingFunction::Linear,
            EasingFunction::Smoothstep,
            EasingFunction::EaseInOutCubic,
        ] {
            assert!((easing.apply(-1.0)).abs() < f32::EPSILON);
            assert!((easing.apply(2.0) - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_monotonic() {
        let e = EasingFunction::Smoothstep;
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = e.apply(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_ease_in_out_cubic_is_symmetric() {
        let e = EasingFunction::EaseInOutCubic;
        assert!((e.apply(0.5) - 0.5).abs() < f32::EPSILON);
        assert!((e.apply(0.25) - 0.0625).abs() < 1e-6);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_easing_names_in_config() {
        #[derive(serde::Deserialize)]
        struct Section {
            easing: EasingFunction,
        }
        let parsed: Section = toml::from_str("easing = \"ease_in_out_cubic\"").unwrap();
        assert_eq!(parsed.easing, EasingFunction::EaseInOutCubic);
        let parsed: Section = toml::from_str("easing = \"linear\"").unwrap();
        assert_eq!(parsed.easing, EasingFunction::Linear);
    }

    #[test]
    fn test_tick_clock_period() {
        let clock = TickClock::new(60);
        assert_eq!(clock.period(), Duration::from_secs(1) / 60);
        assert_eq!(TickClock::new(0).period(), Duration::from_secs(1));
    }

    #[test]
    fn test_tick_delta_is_capped() {
        let mut clock = TickClock::new(60);
        if let Some(earlier) = clock.last.checked_sub(Duration::from_secs(5)) {
            clock.last = earlier;
        }
        let dt = clock.tick();
        assert!(dt <= MAX_TICK_DELTA.as_secs_f32() + f32::EPSILON);
        assert_eq!(clock.ticks(), 1);
    }
}
