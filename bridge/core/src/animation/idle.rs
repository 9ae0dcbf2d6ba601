//! Idle Motion Scheduler
//!
//! Drives one autonomous behavior (auto-blink, head sway) as an explicit
//! state machine resumed once per tick:
//!
//! ```text
//!           enable                 wait elapsed            half duration
//!   Idle ───────────► Waiting ─────────────────► Approach ──────────────► Return
//!    ▲                   ▲                                                  │
//!    │ disable (any      └──────────────────────────────────────────────────┘
//!    │ state, requests                    half duration
//!    │ baseline)
//! ```
//!
//! The scheduler never touches attribute state. Every value it wants is
//! handed to a [`TargetRequester`], which in production enqueues it on the
//! command queue.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::timing::EasingFunction;
use crate::avatar::{AttributeKey, AttributeRange, BLINK, HEAD_PITCH, HEAD_YAW};

/// One requested attribute value
#[derive(Clone, Debug, PartialEq)]
pub struct TargetRequest {
    /// Attribute to set
    pub key: AttributeKey,
    /// Value to set (current and target together)
    pub value: f32,
}

/// Where schedulers send their requested values
pub trait TargetRequester {
    /// Request a batch of values (applied together)
    fn request(&mut self, requests: Vec<TargetRequest>);
}

impl TargetRequester for Vec<TargetRequest> {
    fn request(&mut self, requests: Vec<TargetRequest>) {
        self.extend(requests);
    }
}

/// Inclusive legal interval for a tunable parameter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Lowest legal value
    pub min: f32,
    /// Highest legal value
    pub max: f32,
}

impl Limits {
    /// Create limits
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into limits; non-finite values go to `min`
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

/// How an excursion offset is drawn for a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetShape {
    /// Always `+amplitude` (blink closes fully)
    Fixed,
    /// Uniform in `[-amplitude, +amplitude]`
    Symmetric,
}

/// One attribute driven by a behavior
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Driven attribute
    pub key: AttributeKey,
    /// Current amplitude
    pub amplitude: f32,
    /// Legal amplitudes
    pub amplitude_limits: Limits,
    /// Offset distribution
    pub shape: OffsetShape,
}

impl Channel {
    fn new(name: &str, amplitude: f32, amplitude_limits: Limits, shape: OffsetShape) -> Self {
        Self {
            key: AttributeKey::resolve(name),
            amplitude: amplitude_limits.clamp(amplitude),
            amplitude_limits,
            shape,
        }
    }

    fn baseline(&self) -> f32 {
        AttributeRange::for_key(&self.key).baseline
    }

    fn draw_offset(&self, rng: &mut StdRng) -> f32 {
        match self.shape {
            OffsetShape::Fixed => self.amplitude,
            OffsetShape::Symmetric if self.amplitude > 0.0 => {
                rng.gen_range(-self.amplitude..=self.amplitude)
            }
            OffsetShape::Symmetric => 0.0,
        }
    }
}

/// Static description of a behavior plus its tunable parameters
#[derive(Clone, Debug, PartialEq)]
pub struct IdleBehaviorConfig {
    /// Behavior name for logs
    pub name: &'static str,
    /// Shortest wait between excursions (seconds)
    pub min_interval: f32,
    /// Longest wait between excursions (seconds)
    pub max_interval: f32,
    /// Length of one full excursion (seconds)
    pub duration: f32,
    /// Legal `min_interval` values
    pub min_interval_limits: Limits,
    /// Legal `max_interval` values
    pub max_interval_limits: Limits,
    /// Legal `duration` values
    pub duration_limits: Limits,
    /// Curve for both excursion halves
    pub easing: EasingFunction,
    /// Driven attributes
    pub channels: Vec<Channel>,
}

impl IdleBehaviorConfig {
    /// Periodic blink: closes `Blink` fully and reopens
    #[must_use]
    pub fn auto_blink() -> Self {
        Self {
            name: "auto_blink",
            min_interval: 2.0,
            max_interval: 5.0,
            duration: 0.16,
            min_interval_limits: Limits::new(1.0, 5.0),
            max_interval_limits: Limits::new(3.0, 10.0),
            duration_limits: Limits::new(0.05, 0.5),
            easing: EasingFunction::Smoothstep,
            channels: vec![Channel::new(
                BLINK,
                1.0,
                Limits::new(1.0, 1.0),
                OffsetShape::Fixed,
            )],
        }
    }

    /// Random head sway in yaw and pitch (degrees)
    #[must_use]
    pub fn head_movement() -> Self {
        Self {
            name: "head_movement",
            min_interval: 3.0,
            max_interval: 7.0,
            duration: 2.0,
            min_interval_limits: Limits::new(2.0, 10.0),
            max_interval_limits: Limits::new(3.0, 15.0),
            duration_limits: Limits::new(1.0, 5.0),
            easing: EasingFunction::Smoothstep,
            channels: vec![
                Channel::new(HEAD_YAW, 5.0, Limits::new(2.0, 15.0), OffsetShape::Symmetric),
                Channel::new(HEAD_PITCH, 2.5, Limits::new(1.0, 10.0), OffsetShape::Symmetric),
            ],
        }
    }

    /// Clamp and store timing; raises `max_interval` to `min_interval` if needed
    pub fn set_timing(&mut self, min_interval: f32, max_interval: f32, duration: f32) {
        self.min_interval = self.min_interval_limits.clamp(min_interval);
        self.max_interval = self
            .max_interval_limits
            .clamp(max_interval)
            .max(self.min_interval);
        self.duration = self.duration_limits.clamp(duration);
    }

    /// Clamp and store per-channel amplitudes, in channel order
    ///
    /// Extra values are ignored; missing ones leave the channel unchanged.
    pub fn set_amplitudes(&mut self, amplitudes: &[f32]) {
        for (channel, &amplitude) in self.channels.iter_mut().zip(amplitudes) {
            channel.amplitude = channel.amplitude_limits.clamp(amplitude);
        }
    }

    /// Re-apply clamping to every stored parameter
    #[must_use]
    pub fn clamped(mut self) -> Self {
        let (min, max, duration) = (self.min_interval, self.max_interval, self.duration);
        self.set_timing(min, max, duration);
        let amplitudes: Vec<f32> = self.channels.iter().map(|c| c.amplitude).collect();
        self.set_amplitudes(&amplitudes);
        self
    }
}

/// Scheduler state (without transient data)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseKind {
    /// Disabled, nothing scheduled
    Idle,
    /// Counting down to the next excursion
    Waiting,
    /// Easing away from baseline
    Approach,
    /// Easing back to baseline
    Return,
}

/// Parameters fixed for the lifetime of one excursion
#[derive(Clone, Debug)]
struct Excursion {
    offsets: Vec<f32>,
    half: f32,
    easing: EasingFunction,
}

#[derive(Clone, Debug)]
enum Phase {
    Idle,
    Waiting { remaining: f32 },
    Approach { elapsed: f32, excursion: Excursion },
    Return { elapsed: f32, excursion: Excursion },
}

/// Per-behavior idle animation state machine
#[derive(Debug)]
pub struct IdleMotionScheduler {
    config: IdleBehaviorConfig,
    enabled: bool,
    phase: Phase,
    rng: StdRng,
    excursions: u64,
}

impl IdleMotionScheduler {
    /// Create a disabled scheduler seeded from the OS
    #[must_use]
    pub fn new(config: IdleBehaviorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a disabled scheduler with a fixed seed (deterministic tests)
    #[must_use]
    pub fn with_seed(config: IdleBehaviorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: IdleBehaviorConfig, rng: StdRng) -> Self {
        Self {
            config: config.clamped(),
            enabled: false,
            phase: Phase::Idle,
            rng,
            excursions: 0,
        }
    }

    /// Behavior parameters
    #[must_use]
    pub fn config(&self) -> &IdleBehaviorConfig {
        &self.config
    }

    /// Whether the behavior is scheduling excursions
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current state
    #[must_use]
    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Waiting { .. } => PhaseKind::Waiting,
            Phase::Approach { .. } => PhaseKind::Approach,
            Phase::Return { .. } => PhaseKind::Return,
        }
    }

    /// Completed excursions so far
    #[must_use]
    pub fn excursions(&self) -> u64 {
        self.excursions
    }

    /// Start scheduling; a no-op when already enabled
    ///
    /// Returns whether the state changed.
    pub fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        if matches!(self.phase, Phase::Idle) {
            self.phase = Phase::Waiting {
                remaining: self.draw_interval(),
            };
        }
        tracing::debug!(behavior = self.config.name, "Idle behavior enabled");
        true
    }

    /// Stop scheduling and request baseline for every channel
    ///
    /// Safe to call repeatedly; baseline is requested every time.
    pub fn disable(&mut self, requester: &mut dyn TargetRequester) {
        if self.enabled {
            tracing::debug!(behavior = self.config.name, "Idle behavior disabled");
        }
        self.enabled = false;
        self.phase = Phase::Idle;
        requester.request(self.baseline_requests());
    }

    /// Set enabled state in one call
    pub fn set_enabled(&mut self, enabled: bool, requester: &mut dyn TargetRequester) {
        if enabled {
            self.enable();
        } else {
            self.disable(requester);
        }
    }

    /// Start one excursion now, whether or not the behavior is enabled
    ///
    /// Ignored while an excursion is already running. A disabled behavior
    /// goes back to idle afterwards.
    pub fn trigger_once(&mut self) -> bool {
        if matches!(self.phase, Phase::Approach { .. } | Phase::Return { .. }) {
            return false;
        }
        self.start_excursion();
        true
    }

    /// Clamp and apply timing; takes effect on the next excursion
    pub fn update_timing_parameters(&mut self, min_interval: f32, max_interval: f32, duration: f32) {
        self.config.set_timing(min_interval, max_interval, duration);
        tracing::debug!(
            behavior = self.config.name,
            min_interval = self.config.min_interval,
            max_interval = self.config.max_interval,
            duration = self.config.duration,
            "Idle timing updated"
        );
    }

    /// Clamp and apply per-channel amplitudes; takes effect on the next excursion
    pub fn update_amplitude_parameters(&mut self, amplitudes: &[f32]) {
        self.config.set_amplitudes(amplitudes);
    }

    /// Change the excursion curve; takes effect on the next excursion
    pub fn set_easing(&mut self, easing: EasingFunction) {
        self.config.easing = easing;
    }

    /// Advance by `dt` seconds, requesting values for the current phase
    pub fn tick(&mut self, dt: f32, requester: &mut dyn TargetRequester) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        match &mut self.phase {
            Phase::Idle => {}
            Phase::Waiting { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.start_excursion();
                }
            }
            Phase::Approach { elapsed, excursion } => {
                *elapsed += dt;
                let t = (*elapsed / excursion.half).min(1.0);
                let eased = excursion.easing.apply(t);
                requester.request(offset_requests(
                    &self.config.channels,
                    &excursion.offsets,
                    eased,
                ));

                if t >= 1.0 {
                    let excursion = excursion.clone();
                    self.phase = Phase::Return {
                        elapsed: 0.0,
                        excursion,
                    };
                }
            }
            Phase::Return { elapsed, excursion } => {
                *elapsed += dt;
                let t = (*elapsed / excursion.half).min(1.0);
                let eased = 1.0 - excursion.easing.apply(t);
                requester.request(offset_requests(
                    &self.config.channels,
                    &excursion.offsets,
                    eased,
                ));

                if t >= 1.0 {
                    self.excursions += 1;
                    self.phase = if self.enabled {
                        Phase::Waiting {
                            remaining: self.draw_interval(),
                        }
                    } else {
                        Phase::Idle
                    };
                }
            }
        }
    }

    fn start_excursion(&mut self) {
        let offsets: Vec<f32> = self
            .config
            .channels
            .iter()
            .map(|c| c.draw_offset(&mut self.rng))
            .collect();
        tracing::trace!(behavior = self.config.name, ?offsets, "Starting excursion");
        self.phase = Phase::Approach {
            elapsed: 0.0,
            excursion: Excursion {
                offsets,
                half: self.config.duration / 2.0,
                easing: self.config.easing,
            },
        };
    }

    fn draw_interval(&mut self) -> f32 {
        let (lo, hi) = (self.config.min_interval, self.config.max_interval);
        if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }

    fn baseline_requests(&self) -> Vec<TargetRequest> {
        self.config
            .channels
            .iter()
            .map(|c| TargetRequest {
                key: c.key.clone(),
                value: c.baseline(),
            })
            .collect()
    }
}

fn offset_requests(channels: &[Channel], offsets: &[f32], progress: f32) -> Vec<TargetRequest> {
    channels
        .iter()
        .zip(offsets)
        .map(|(channel, offset)| TargetRequest {
            key: channel.key.clone(),
            value: channel.baseline() + offset * progress,
        })
        .collect()
}
