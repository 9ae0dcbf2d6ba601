//! Headless render loop
//!
//! Stands in for an engine's frame callback: a dedicated thread ticks the
//! controller at a fixed rate and publishes frames to a target that only
//! logs them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bridge_core::{AvatarController, FrameSnapshot, RenderTarget, TickClock};
use tracing::{debug, trace};

/// How often the headless target logs a frame summary
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

/// Render target that logs frames instead of drawing them
pub struct HeadlessTarget {
    frames: u64,
    last_summary: Instant,
}

impl HeadlessTarget {
    pub fn new() -> Self {
        Self {
            frames: 0,
            last_summary: Instant::now(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderTarget for HeadlessTarget {
    fn publish(&mut self, frame: &FrameSnapshot<'_>) {
        self.frames += 1;
        trace!(frame = frame.frame(), attributes = frame.len(), "Frame published");

        if self.last_summary.elapsed() >= SUMMARY_INTERVAL {
            self.last_summary = Instant::now();
            let moving: Vec<String> = frame
                .iter()
                .filter(|(_, value)| value.abs() > f32::EPSILON)
                .map(|(key, value)| format!("{key}={value:.2}"))
                .collect();
            debug!(frame = frame.frame(), active = ?moving, "Frame summary");
        }
    }
}

/// Spawn the render thread
///
/// The thread runs until `running` is cleared and hands the controller back
/// when joined.
pub fn spawn(
    mut controller: AvatarController,
    tick_rate_hz: u32,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<AvatarController>> {
    std::thread::Builder::new()
        .name("bridge-render".to_string())
        .spawn(move || {
            let mut clock = TickClock::new(tick_rate_hz);
            let mut target = HeadlessTarget::new();
            debug!(period_ms = clock.period().as_millis() as u64, "Render loop started");

            while running.load(Ordering::SeqCst) {
                std::thread::sleep(clock.until_next());
                let dt = clock.tick();
                let stats = controller.tick(dt, &mut target);
                if stats.failed > 0 || stats.panicked > 0 {
                    debug!(
                        failed = stats.failed,
                        panicked = stats.panicked,
                        "Queued actions failed this frame"
                    );
                }
            }

            debug!(ticks = clock.ticks(), frames = target.frames(), "Render loop stopped");
            controller
        })
}
