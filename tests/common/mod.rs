//! Common test utilities for abl integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's real data or config directories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated data and config directories.
///
/// - `data_dir`: passed as `ABL_DATA_DIR`; the store lives in `abilities/`
/// - `config_dir`: passed as `ABL_CONFIG_DIR`; holds config.kdl
///
/// The `abl()` method sets both per invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create an environment whose store starts empty (seeding disabled).
    pub fn new() -> Self {
        let env = Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        };
        env.write_config("seed-defaults #false\n");
        env
    }

    /// Create an environment whose store is seeded with the bundled defaults
    /// on first use.
    pub fn seeded() -> Self {
        let env = Self::new();
        env.write_config("seed-defaults #true\n");
        env
    }

    /// Get a Command for the abl binary with isolated directories.
    pub fn abl(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_abl"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("ABL_DATA_DIR", self.data_dir.path());
        cmd.env("ABL_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("ABL_LOG");
        cmd
    }

    /// Replace config.kdl.
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.kdl"), content).unwrap();
    }

    /// Root of the ability store.
    pub fn store_root(&self) -> PathBuf {
        self.data_dir.path().join("abilities")
    }

    /// Write a raw document relative to the store root.
    pub fn write_doc(&self, relative: &str, content: &str) {
        let path = self.store_root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Run a command expected to succeed and parse its JSON stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.abl().args(args).output().expect("Failed to run abl");
        assert!(
            output.status.success(),
            "abl {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("Invalid JSON")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
