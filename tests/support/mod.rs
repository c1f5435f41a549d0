//! Test support utilities for fleetkeys integration tests.
//!
//! Every test gets an isolated project directory containing a `fleet.toml`
//! whose `[tools]` point at fake `sops`, `ssh-keygen`, `ssh-to-age`, `ssh`
//! and `scp` scripts. The fakes append their arguments to `calls.log`.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;
use tempfile::TempDir;

/// Test environment with an isolated project directory.
///
/// Child processes use `.current_dir()`, so tests can run in parallel.
pub struct Test {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl Test {
    /// Project with one provisionable target `a` and one target `b` without secrets.
    pub fn new() -> Self {
        let t = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        };
        std::fs::create_dir_all(t.bin()).expect("failed to create bin dir");
        t.write_fakes();
        t.write_config(DEFAULT_TARGETS);
        t.write_file("secrets/a.yaml", ENCRYPTED_FIXTURE);
        t
    }

    /// Directory holding the fake tools.
    pub fn bin(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    /// Path of the shared call log.
    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Lines appended by the fake tools, in call order.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Calls made to one tool.
    pub fn calls_to(&self, tool: &str) -> Vec<String> {
        let prefix = format!("{} ", tool);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }

    /// Write a file relative to the project directory.
    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(path, contents).expect("failed to write file");
    }
}
