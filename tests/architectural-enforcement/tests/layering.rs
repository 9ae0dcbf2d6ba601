//! Integration Test: Render-State Isolation
//!
//! **Policy**: Only the render thread mutates attribute state. The I/O side
//! (transport, protocol, command queue) must not name render-thread types;
//! it hands decoded commands to a callback and nothing more.

use architectural_enforcement::{find_references, report, rust_sources};

const RENDER_THREAD_TYPES: &[&str] = &[
    "BlendEngine",
    "IdleMotionScheduler",
    "AvatarController",
    "crate::animation",
    "crate::controller",
];

#[test]
fn test_transport_does_not_touch_render_state() {
    let files = rust_sources("bridge/core/src/transport");
    assert!(!files.is_empty(), "transport sources not found");
    report(
        "Transport references render-thread state",
        &find_references(&files, RENDER_THREAD_TYPES),
    );
}

#[test]
fn test_protocol_does_not_touch_render_state() {
    let files = rust_sources("bridge/core/src/protocol");
    assert!(!files.is_empty(), "protocol sources not found");
    report(
        "Protocol references render-thread state",
        &find_references(&files, RENDER_THREAD_TYPES),
    );
}

#[test]
fn test_queue_is_context_agnostic() {
    let files: Vec<_> = rust_sources("bridge/core/src")
        .into_iter()
        .filter(|f| f.path.ends_with("queue.rs"))
        .collect();
    assert_eq!(files.len(), 1, "queue.rs not found");

    let mut needles = RENDER_THREAD_TYPES.to_vec();
    needles.push("crate::transport");
    report(
        "Command queue depends on a concrete context",
        &find_references(&files, &needles),
    );
}
