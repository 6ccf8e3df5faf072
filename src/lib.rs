//! sprintrecon - Reconcile a sprint's planned tasks against reported status.
//!
//! This library provides the core functionality for the `spr` CLI tool:
//! recording planned and reported tasks per sprint, classifying every task
//! code as in progress, not reported or new, and persisting the final
//! comparison report with reasons.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod intake;
pub mod models;
pub mod reconcile;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Test environment with isolated storage using dependency injection.
    pub struct TestEnv {
        /// Simulated workspace directory
        pub workspace_dir: TempDir,
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with isolated directories.
        pub fn new() -> Self {
            Self {
                workspace_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the simulated workspace.
        pub fn path(&self) -> &Path {
            self.workspace_dir.path()
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.path(), self.data_path()).unwrap()
        }

        /// Open storage for this test environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.path(), self.data_path()).unwrap()
        }

        /// Check if storage exists for this test environment.
        pub fn storage_exists(&self) -> bool {
            Storage::exists_with_data_dir(self.path(), self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for sprintrecon operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Not initialized: run `spr system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sprint already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sprintrecon operations.
pub type Result<T> = std::result::Result<T, Error>;
