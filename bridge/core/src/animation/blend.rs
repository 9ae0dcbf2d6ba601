//! Attribute Blend Engine
//!
//! Every attribute has a commanded `target` and a rendered `current`. Each
//! tick moves `current` toward `target` by a time-scaled fraction of the
//! remaining gap:
//!
//! ```text
//! if |current - target| < ε:  current = target
//! else:                       current += (target - current) * clamp01(dt * speed)
//! ```
//!
//! Afterwards every attribute's `current` value is published to the
//! [`RenderTarget`] as one frame, whether or not it changed.

use std::collections::BTreeMap;

use crate::avatar::{AttributeKey, AttributeRange, AttributeRegistry, NEUTRAL};

/// Gap below which `current` snaps to `target`
pub const SNAP_EPSILON: f32 = 0.001;

/// Slowest legal blend speed
pub const MIN_SPEED: f32 = 0.1;

/// Fastest legal blend speed
pub const MAX_SPEED: f32 = 10.0;

/// Blend speed used until the controller changes it
pub const DEFAULT_SPEED: f32 = 2.0;

/// Per-attribute blend state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attribute {
    /// Rendered value
    pub current: f32,
    /// Commanded value
    pub target: f32,
    /// Legal interval for both values
    pub range: AttributeRange,
}

impl Attribute {
    fn at_baseline(range: AttributeRange) -> Self {
        Self {
            current: range.baseline,
            target: range.baseline,
            range,
        }
    }

    /// Whether `current` has reached `target`
    #[must_use]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < f32::EPSILON
    }
}

/// Read-only view of one published frame
#[derive(Debug)]
pub struct FrameSnapshot<'a> {
    attributes: &'a BTreeMap<AttributeKey, Attribute>,
    frame: u64,
}

impl FrameSnapshot<'_> {
    /// Frame counter (starts at 1)
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// `(key, current)` for every tracked attribute, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, f32)> + '_ {
        self.attributes.iter().map(|(k, a)| (k, a.current))
    }

    /// Current value of one attribute
    #[must_use]
    pub fn get(&self, key: &AttributeKey) -> Option<f32> {
        self.attributes.get(key).map(|a| a.current)
    }

    /// Number of attributes in the frame
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the frame is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Receives the rendered attribute values once per tick
pub trait RenderTarget: Send {
    /// Apply a complete frame
    fn publish(&mut self, frame: &FrameSnapshot<'_>);
}

/// Owns every attribute's current and target value
pub struct BlendEngine {
    attributes: BTreeMap<AttributeKey, Attribute>,
    speed: f32,
    registry: Option<Box<dyn AttributeRegistry>>,
    frame: u64,
}

impl Default for BlendEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

impl std::fmt::Debug for BlendEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlendEngine")
            .field("attributes", &self.attributes)
            .field("speed", &self.speed)
            .field("bound", &self.registry.is_some())
            .field("frame", &self.frame)
            .finish()
    }
}

impl BlendEngine {
    /// Create an engine with the given blend speed (clamped)
    #[must_use]
    pub fn new(speed: f32) -> Self {
        let mut engine = Self {
            attributes: BTreeMap::new(),
            speed: DEFAULT_SPEED,
            registry: None,
            frame: 0,
        };
        engine.set_speed(speed);
        engine
    }

    /// Shared blend speed
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Change the blend speed, clamped to `[MIN_SPEED, MAX_SPEED]`
    ///
    /// Returns the value actually stored. Non-finite input is ignored.
    pub fn set_speed(&mut self, speed: f32) -> f32 {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        } else {
            tracing::warn!(speed, "Ignoring non-finite transition speed");
        }
        self.speed
    }

    /// Set an attribute's target, clamped to its range
    ///
    /// Creates the attribute at its baseline on first reference. Returns the
    /// stored (clamped) target.
    pub fn set_target(&mut self, key: &AttributeKey, value: f32) -> f32 {
        let attribute = self.ensure(key);
        attribute.target = attribute.range.clamp(value);
        attribute.target
    }

    /// Set current and target together, bypassing smoothing
    pub fn set_immediate(&mut self, key: &AttributeKey, value: f32) -> f32 {
        let attribute = self.ensure(key);
        let value = attribute.range.clamp(value);
        attribute.current = value;
        attribute.target = value;
        value
    }

    /// Soft reset: every target to 0, `Neutral` (if tracked) to 1
    pub fn reset_all(&mut self) {
        let neutral = AttributeKey::resolve(NEUTRAL);
        for (key, attribute) in &mut self.attributes {
            let rest = if *key == neutral { 1.0 } else { 0.0 };
            attribute.target = attribute.range.clamp(rest);
        }
    }

    /// Rendered value of an attribute
    #[must_use]
    pub fn current(&self, key: &AttributeKey) -> Option<f32> {
        self.attributes.get(key).map(|a| a.current)
    }

    /// Commanded value of an attribute
    #[must_use]
    pub fn target(&self, key: &AttributeKey) -> Option<f32> {
        self.attributes.get(key).map(|a| a.target)
    }

    /// Full blend state of an attribute
    #[must_use]
    pub fn attribute(&self, key: &AttributeKey) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// Number of tracked attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no attribute has been referenced yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Whether every attribute has reached its target
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.attributes.values().all(Attribute::is_settled)
    }

    /// Attach the loaded asset's registry
    pub fn bind(&mut self, registry: Box<dyn AttributeRegistry>) {
        for key in self.attributes.keys() {
            if !registry.locate(key) {
                tracing::debug!(attribute = %key, "Tracked attribute not exposed by asset");
            }
        }
        self.registry = Some(registry);
    }

    /// Detach the registry; attribute values are kept
    pub fn unbind(&mut self) -> Option<Box<dyn AttributeRegistry>> {
        self.registry.take()
    }

    /// Whether a registry is bound
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.registry.is_some()
    }

    /// Blend every attribute one step of `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let factor = (dt * self.speed).clamp(0.0, 1.0);

        for attribute in self.attributes.values_mut() {
            let gap = attribute.target - attribute.current;
            if gap.abs() < SNAP_EPSILON {
                attribute.current = attribute.target;
            } else {
                attribute.current += gap * factor;
            }
        }
    }

    /// Publish every current value as one frame
    pub fn publish(&mut self, target: &mut dyn RenderTarget) {
        self.frame += 1;
        target.publish(&FrameSnapshot {
            attributes: &self.attributes,
            frame: self.frame,
        });
    }

    /// `advance` then `publish`
    pub fn tick(&mut self, dt: f32, target: &mut dyn RenderTarget) {
        self.advance(dt);
        self.publish(target);
    }

    fn ensure(&mut self, key: &AttributeKey) -> &mut Attribute {
        if !self.attributes.contains_key(key) {
            if let Some(registry) = &self.registry {
                if !registry.locate(key) {
                    tracing::debug!(attribute = %key, "Asset does not expose attribute, tracking anyway");
                }
            }
            tracing::trace!(attribute = %key, "Tracking new attribute");
        }
        self.attributes
            .entry(key.clone())
            .or_insert_with(|| Attribute::at_baseline(AttributeRange::for_key(key)))
    }
}
