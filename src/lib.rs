//! abl - Ability document store and deterministic prompt resolver.
//!
//! This library provides the core functionality for the `abl` CLI tool:
//! parsing ability documents, loading them from a store directory, resolving
//! a persona request into an ordered selection, and rendering the prompt plus
//! its audit manifest.

pub mod abilities;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod storage;

pub use abilities::{
    AbilityDocument, AbilityType, Catalog, Manifest, ResolutionRequest, ResolutionResult,
};
pub use storage::{AbilityStore, StoreSummary, WriteRequest};

/// Test utilities for isolated store directories.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::storage::AbilityStore;

    /// Test environment with an isolated store root.
    pub struct TestEnv {
        /// Directory that holds the store root
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Root of the ability store inside the data directory.
        pub fn root(&self) -> std::path::PathBuf {
            self.data_dir.path().join("abilities")
        }

        /// Open the store without seeding bundled defaults.
        pub fn store(&self) -> AbilityStore {
            AbilityStore::open(self.root(), false).unwrap()
        }

        /// Write a raw document file relative to the store root.
        pub fn write_file(&self, relative: &str, content: &str) {
            let path = self.root().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
        }

        pub fn path(&self) -> &Path {
            self.data_dir.path()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for abl operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid document type, traversal attempt, bad write input, or config file problem.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for abl operations.
pub type Result<T> = std::result::Result<T, Error>;
