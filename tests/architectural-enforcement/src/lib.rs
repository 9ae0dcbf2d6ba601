//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The I/O side (transport, protocol, queue) never names render-thread state
//! - No sleep() calls in production code outside frame pacing and backoff
//! - No unwrap()/expect() in production code
//!
//! The helpers here scan workspace sources; test modules (everything after a
//! `#[cfg(test)]` line) and comments are ignored.

use std::fs;
use std::path::{Path, PathBuf};

/// A source file split into lines
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Raw lines
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Production lines as `(line_number, code_without_comment)`
    ///
    /// Stops at the first `#[cfg(test)]`.
    pub fn production_lines(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
            .map(|(idx, line)| (idx + 1, strip_comment(line)))
            .filter(|(_, code)| !code.trim().is_empty())
    }

    /// Lines around `line_number` (1-based), lowercased
    pub fn context(&self, line_number: usize, before: usize, after: usize) -> Vec<String> {
        let idx = line_number.saturating_sub(1);
        let start = idx.saturating_sub(before);
        let end = (idx + after + 1).min(self.lines.len());
        self.lines[start..end]
            .iter()
            .map(|l| l.to_lowercase())
            .collect()
    }
}

/// One rule violation
#[derive(Debug)]
pub struct Violation {
    /// File the violation is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending code
    pub code: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.code.trim())
    }
}

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn rust_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root();
    let base = root.join(dir);
    if !base.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&base)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            let path = e
                .path()
                .strip_prefix(&root)
                .unwrap_or(e.path())
                .to_path_buf();
            Some(SourceFile {
                path,
                lines: content.lines().map(str::to_string).collect(),
            })
        })
        .collect()
}

/// Collect production lines in `files` that contain any of `needles`
pub fn find_references(files: &[SourceFile], needles: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for file in files {
        for (line, code) in file.production_lines() {
            if needles.iter().any(|n| code.contains(n)) {
                violations.push(Violation {
                    path: file.path.clone(),
                    line,
                    code: code.to_string(),
                });
            }
        }
    }
    violations
}

/// Panic with a readable report if there are violations
pub fn report(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s): {title}.\nFix these before merging!",
        violations.len()
    );
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            lines: [
                "fn a() {} // trailing",
                "// only a comment",
                "#[cfg(test)]",
                "fn b() {}",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        };
        let lines: Vec<_> = file.production_lines().collect();
        assert_eq!(lines, vec![(1, "fn a() {} ")]);
    }

    #[test]
    fn test_workspace_root_contains_bridge() {
        assert!(workspace_root().join("bridge").join("core").exists());
    }
}
