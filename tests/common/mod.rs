//! Shared fixtures for the `spr` CLI tests.
//!
//! Every test gets its own workspace, record store and system config
//! directory, so runs never see the developer's sprints or preferences.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Isolated workspace plus the directories `spr` reads through env vars.
///
/// - `workspace_dir`: the working directory; its path hash picks the store
/// - `data_dir`: `SPR_DATA_DIR`, holding the store and `action.log`
/// - `config_dir`: `SPR_CONFIG_DIR`, holding the system `config.kdl`
pub struct TestEnv {
    pub workspace_dir: TempDir,
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            workspace_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Environment whose store has been created with `spr system init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.spr().args(["system", "init"]).assert().success();
        env
    }

    /// Initialized store with sprint `id` opened and no tasks recorded yet.
    ///
    /// Most reconciliation tests start here and add planned/reported rows
    /// with `-s <id>`.
    pub fn with_sprint(id: &str) -> Self {
        let env = Self::init();
        env.spr().args(["sprint", "open", id]).assert().success();
        env
    }

    /// `spr` command scoped to this environment.
    ///
    /// `SPR_SPRINT`, `SPR_WORKSPACE` and `SPR_LOG` from the caller's shell are
    /// cleared so a test only sees the sprint it passes with `-s`.
    pub fn spr(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_spr"));
        cmd.current_dir(self.workspace_dir.path());
        cmd.env("SPR_DATA_DIR", self.data_dir.path());
        cmd.env("SPR_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("SPR_SPRINT");
        cmd.env_remove("SPR_WORKSPACE");
        cmd.env_remove("SPR_LOG");
        cmd
    }

    /// Run a command that must succeed and parse its JSON stdout.
    pub fn spr_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.spr().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "spr {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Write an import or reasons file into the workspace and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> String {
        let path = self.workspace_dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    /// Write the system-level `config.kdl`.
    pub fn write_system_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.kdl"), content).unwrap();
    }

    pub fn path(&self) -> &std::path::Path {
        self.workspace_dir.path()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
