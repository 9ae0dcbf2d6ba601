//! Idle motion scheduling properties
//!
//! Runs seeded schedulers for long stretches of simulated time and checks
//! the invariants that hold for every excursion:
//!
//! - waits stay inside `[min_interval, max_interval]`
//! - requested values stay inside `baseline ± amplitude`
//! - every excursion ends exactly on baseline
//!
//! # Running
//!
//! ```bash
//! cargo test -p bridge-core --test idle_motion_tests
//! ```

use bridge_core::{
    AttributeKey, IdleBehaviorConfig, IdleMotionScheduler, PhaseKind, TargetRequest,
};

const DT: f32 = 0.01;

fn blink() -> AttributeKey {
    AttributeKey::resolve("blink")
}

fn yaw() -> AttributeKey {
    AttributeKey::resolve("headyaw")
}

/// Tick `seconds` of simulated time, collecting phase per tick and requests
fn simulate(
    scheduler: &mut IdleMotionScheduler,
    seconds: f32,
) -> (Vec<PhaseKind>, Vec<Vec<TargetRequest>>) {
    let ticks = (seconds / DT) as usize;
    let mut phases = Vec::with_capacity(ticks);
    let mut frames = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let mut requests = Vec::new();
        scheduler.tick(DT, &mut requests);
        phases.push(scheduler.phase());
        frames.push(requests);
    }
    (phases, frames)
}

// =============================================================================
// Timing
// =============================================================================

#[test]
fn waits_stay_within_interval_bounds() {
    let mut scheduler = IdleMotionScheduler::with_seed(IdleBehaviorConfig::auto_blink(), 42);
    scheduler.enable();

    let (phases, _) = simulate(&mut scheduler, 300.0);

    let mut waits = Vec::new();
    let mut run = 0usize;
    for phase in &phases {
        if *phase == PhaseKind::Waiting {
            run += 1;
        } else if run > 0 {
            waits.push(run);
            run = 0;
        }
    }

    assert!(waits.len() > 20, "only {} excursions", waits.len());
    // First wait includes the enable tick offset; all are bounded the same way
    for ticks in waits {
        let seconds = ticks as f32 * DT;
        assert!(seconds >= 2.0 - 2.0 * DT, "wait too short: {seconds}");
        assert!(seconds <= 5.0 + 2.0 * DT, "wait too long: {seconds}");
    }
}

#[test]
fn same_seed_same_motion() {
    let config = IdleBehaviorConfig::head_movement();
    let mut a = IdleMotionScheduler::with_seed(config.clone(), 9);
    let mut b = IdleMotionScheduler::with_seed(config, 9);
    a.enable();
    b.enable();

    let (_, frames_a) = simulate(&mut a, 60.0);
    let (_, frames_b) = simulate(&mut b, 60.0);
    assert_eq!(frames_a, frames_b);
    assert_eq!(a.excursions(), b.excursions());
}

// =============================================================================
// Amplitude
// =============================================================================

#[test]
fn head_sway_stays_within_amplitude() {
    let mut scheduler =
        IdleMotionScheduler::with_seed(IdleBehaviorConfig::head_movement(), 1234);
    scheduler.update_amplitude_parameters(&[8.0, 3.0]);
    scheduler.enable();

    let (_, frames) = simulate(&mut scheduler, 120.0);
    let values: Vec<f32> = frames
        .iter()
        .flatten()
        .filter(|r| r.key == yaw())
        .map(|r| r.value)
        .collect();

    assert!(!values.is_empty());
    assert!(values.iter().all(|v| v.abs() <= 8.0 + 1e-4));
    assert!(values.iter().any(|v| v.abs() > 0.5));
}

#[test]
fn blink_closes_fully_and_reopens() {
    let mut scheduler = IdleMotionScheduler::with_seed(IdleBehaviorConfig::auto_blink(), 5);
    assert!(scheduler.trigger_once());

    let (phases, frames) = simulate(&mut scheduler, 1.0);
    let values: Vec<f32> = frames
        .iter()
        .flatten()
        .filter(|r| r.key == blink())
        .map(|r| r.value)
        .collect();

    let peak = values.iter().copied().fold(0.0_f32, f32::max);
    assert!((peak - 1.0).abs() < 1e-4, "peak {peak}");
    assert_eq!(values.last().copied(), Some(0.0));
    // Disabled behavior returns to idle after a manual trigger
    assert_eq!(phases.last().copied(), Some(PhaseKind::Idle));
    assert_eq!(scheduler.excursions(), 1);
}

// =============================================================================
// Enable / disable
// =============================================================================

#[test]
fn disabled_scheduler_is_silent() {
    let mut scheduler = IdleMotionScheduler::with_seed(IdleBehaviorConfig::auto_blink(), 3);
    let (phases, frames) = simulate(&mut scheduler, 30.0);
    assert!(phases.iter().all(|p| *p == PhaseKind::Idle));
    assert!(frames.iter().all(Vec::is_empty));
}

#[test]
fn disable_mid_excursion_requests_baseline() {
    let mut scheduler =
        IdleMotionScheduler::with_seed(IdleBehaviorConfig::head_movement(), 77);
    scheduler.enable();
    scheduler.trigger_once();
    simulate(&mut scheduler, 0.5);
    assert_eq!(scheduler.phase(), PhaseKind::Approach);

    let mut requests = Vec::new();
    scheduler.disable(&mut requests);
    assert_eq!(scheduler.phase(), PhaseKind::Idle);
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.value == 0.0));

    // Nothing further once disabled
    let (_, frames) = simulate(&mut scheduler, 20.0);
    assert!(frames.iter().all(Vec::is_empty));
}

#[test]
fn timing_update_applies_to_next_wait() {
    let mut scheduler = IdleMotionScheduler::with_seed(IdleBehaviorConfig::auto_blink(), 11);
    scheduler.update_timing_parameters(1.0, 3.0, 0.1);
    scheduler.enable();

    let (phases, _) = simulate(&mut scheduler, 4.0);
    assert!(phases.iter().any(|p| *p != PhaseKind::Waiting));
}
