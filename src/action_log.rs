//! Action logging for `spr` commands.
//!
//! Every command invocation is appended to a JSONL log file, with arguments
//! sanitized so free-text reasons and file paths stay short.

use crate::config::ResolvedConfig;
use crate::storage::resolve_data_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Maximum length of a string argument kept verbatim.
const MAX_ARG_LEN: usize = 100;

/// Arrays longer than this are summarized.
const MAX_ARRAY_LEN: usize = 10;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Workspace path where the command was executed
    pub workspace: String,

    /// Command name (e.g., "planned add", "finalize")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the configured log file.
///
/// Logging problems are reported as warnings and never fail the command.
pub fn log_action(
    config: &ResolvedConfig,
    workspace: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !config.action_log_enabled() {
        return;
    }

    let log_path = match get_log_path(config) {
        Some(path) => path,
        None => {
            warn!("could not determine action log path");
            return;
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        workspace: workspace.to_string_lossy().to_string(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        warn!(path = %log_path.display(), error = %e, "failed to write action log");
    }
}

/// Get the log file path from configuration.
///
/// Default: `<data dir>/action.log`
pub fn get_log_path(config: &ResolvedConfig) -> Option<PathBuf> {
    if let Some(path) = config.action_log_path() {
        return Some(expand_home(Path::new(path)));
    }
    resolve_data_dir().ok().map(|dir| dir.join("action.log"))
}

/// Expand ~ in path to home directory.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Sanitize arguments before they are logged.
///
/// File paths are reduced to their basename, long strings truncated and
/// large arrays summarized.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize_args(value)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            if arr.len() > MAX_ARRAY_LEN {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let chars = sanitized.chars().count();
            if chars > MAX_ARG_LEN {
                let head: String = sanitized.chars().take(MAX_ARG_LEN - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, chars))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Resolved, ValueSource};
    use tempfile::TempDir;

    fn config_with_path(path: &Path, enabled: bool) -> ResolvedConfig {
        ResolvedConfig {
            action_log: Resolved::new(enabled, ValueSource::Session),
            action_log_path: Some(Resolved::new(
                path.to_string_lossy().to_string(),
                ValueSource::Session,
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_sanitize_simple_string() {
        let value = serde_json::json!("hello");
        assert_eq!(sanitize_args(&value), serde_json::json!("hello"));
    }

    #[test]
    fn test_sanitize_file_path() {
        let value = serde_json::json!("/home/alice/sprints/planned.json");
        assert_eq!(sanitize_args(&value), serde_json::json!("planned.json"));
    }

    #[test]
    fn test_sanitize_windows_path() {
        let value = serde_json::json!("C:\\Users\\test\\reasons.json");
        assert_eq!(sanitize_args(&value), serde_json::json!("reasons.json"));
    }

    #[test]
    fn test_sanitize_long_reason() {
        let value = serde_json::json!("é".repeat(150));
        if let serde_json::Value::String(s) = sanitize_args(&value) {
            assert!(s.contains("... (150 chars)"));
        } else {
            panic!("Expected string value");
        }
    }

    #[test]
    fn test_sanitize_large_array() {
        let codes: Vec<String> = (0..15).map(|i| format!("T{}", i)).collect();
        let value = serde_json::json!(codes);
        assert_eq!(
            sanitize_args(&value),
            serde_json::json!("[Array with 15 items]")
        );
    }

    #[test]
    fn test_sanitize_nested_object() {
        let value = serde_json::json!({
            "sprint": "2024-S3",
            "reasons_file": "/tmp/reasons.json",
            "code": ["T1", "T2"]
        });
        let sanitized = sanitize_args(&value);
        assert_eq!(sanitized["sprint"], "2024-S3");
        assert_eq!(sanitized["reasons_file"], "reasons.json");
        assert_eq!(sanitized["code"], serde_json::json!(["T1", "T2"]));
    }

    #[test]
    fn test_log_action_writes_jsonl() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("logs").join("action.log");
        let config = config_with_path(&log, true);

        log_action(
            &config,
            dir.path(),
            "sprint open",
            serde_json::json!({"id": "S1"}),
            true,
            None,
            12,
        );
        log_action(
            &config,
            dir.path(),
            "report",
            serde_json::json!({"sprint": "S1"}),
            false,
            Some("Sprint not found: S1".to_string()),
            3,
        );

        let content = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ActionLog = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.command, "sprint open");
        assert!(first.success);
        let second: ActionLog = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.error.as_deref(), Some("Sprint not found: S1"));
    }

    #[test]
    fn test_log_action_disabled() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("action.log");
        let config = config_with_path(&log, false);

        log_action(&config, dir.path(), "report", serde_json::json!({}), true, None, 1);
        assert!(!log.exists());
    }
}
