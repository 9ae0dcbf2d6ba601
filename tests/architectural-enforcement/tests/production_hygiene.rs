//! Integration Test: Production Code Hygiene
//!
//! **Policy**:
//! - No sleep() in production code. Exceptions: frame pacing on the render
//!   thread and accept backoff on the I/O thread.
//! - No `unwrap()` / `expect()` in production code; errors are propagated or
//!   logged.

use architectural_enforcement::{report, rust_sources, SourceFile, Violation};

const PRODUCTION_DIRS: &[&str] = &["bridge/core/src", "bridge/daemon/src"];

fn production_files() -> Vec<SourceFile> {
    let files: Vec<_> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_sources(dir))
        .collect();
    assert!(!files.is_empty(), "no production sources found");
    files
}

/// Sleep used to wait for the next frame deadline
fn is_frame_pacing(file: &SourceFile, line: usize) -> bool {
    file.context(line, 3, 1)
        .iter()
        .any(|l| l.contains("until_next") || l.contains("tick_rate"))
}

/// Sleep used to back off after a failed operation
fn is_backoff(file: &SourceFile, line: usize) -> bool {
    file.context(line, 3, 1)
        .iter()
        .any(|l| l.contains("backoff"))
}

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for file in &production_files() {
        for (line, code) in file.production_lines() {
            if !(code.contains("::sleep(") || code.contains(".sleep(")) {
                continue;
            }
            if is_frame_pacing(file, line) || is_backoff(file, line) {
                continue;
            }
            violations.push(Violation {
                path: file.path.clone(),
                line,
                code: code.to_string(),
            });
        }
    }

    if !violations.is_empty() {
        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        eprintln!("  - Render loop waiting for the next tick deadline");
        eprintln!("  - Backoff after a failed accept()");
    }
    report("Sleep calls found in production code", &violations);
}

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();
    for file in &production_files() {
        for (line, code) in file.production_lines() {
            if code.contains(".unwrap()") || code.contains(".expect(") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line,
                    code: code.to_string(),
                });
            }
        }
    }
    report("unwrap()/expect() found in production code", &violations);
}
