//! Animation System - Blending and Idle Motion
//!
//! Two pieces run on the render thread, in this order each tick:
//!
//! ```text
//! IdleMotionScheduler::tick ──requests──► CommandQueue (applied next drain)
//! BlendEngine::tick ──────────frame─────► RenderTarget
//! ```
//!
//! - **Frame-rate independent**: blending and excursions are scaled by `dt`
//! - **Single writer**: only [`BlendEngine`] stores attribute values;
//!   schedulers request changes and never read them back

pub mod blend;
pub mod idle;
pub mod timing;

pub use blend::{
    Attribute, BlendEngine, FrameSnapshot, RenderTarget, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED,
    SNAP_EPSILON,
};
pub use idle::{
    Channel, IdleBehaviorConfig, IdleMotionScheduler, Limits, OffsetShape, PhaseKind,
    TargetRequest, TargetRequester,
};
pub use timing::{EasingFunction, TickClock, MAX_TICK_DELTA};
