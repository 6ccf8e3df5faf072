//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`<storage root>/config.kdl`)
//! 3. System config.kdl (`$SPR_CONFIG_DIR/config.kdl`, else `~/.config/sprintrecon/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::{OutputFormat, SprConfig};
use crate::storage::Storage;
use serde::Serialize;
use std::path::Path;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Whether the action log is written
    pub action_log: Resolved<bool>,
    /// Custom action log location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_log_path: Option<Resolved<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
            action_log_path: None,
        }
    }
}

impl ResolvedConfig {
    /// Get the output format value.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    /// Whether output should be human-readable.
    pub fn human(&self) -> bool {
        self.output_format.value == OutputFormat::Human
    }

    /// Whether the action log is enabled.
    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }

    /// Custom action log path, if configured.
    pub fn action_log_path(&self) -> Option<&str> {
        self.action_log_path.as_ref().map(|r| r.value.as_str())
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

fn pick<T: Clone>(
    cli: Option<&T>,
    session: Option<&T>,
    system: Option<&T>,
) -> Option<Resolved<T>> {
    if let Some(v) = cli {
        Some(Resolved::new(v.clone(), ValueSource::CliFlag))
    } else if let Some(v) = session {
        Some(Resolved::new(v.clone(), ValueSource::Session))
    } else {
        system.map(|v| Resolved::new(v.clone(), ValueSource::System))
    }
}

/// Resolve configuration from already-loaded config files.
pub fn resolve(
    system: &SprConfig,
    session: &SprConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(format) = pick(
        overrides.output_format.as_ref(),
        session.output_format.as_ref(),
        system.output_format.as_ref(),
    ) {
        result.output_format = format;
    }

    if let Some(enabled) = pick(None, session.action_log.as_ref(), system.action_log.as_ref()) {
        result.action_log = enabled;
    }

    result.action_log_path = pick(
        None,
        session.action_log_path.as_ref(),
        system.action_log_path.as_ref(),
    );

    result
}

/// Resolve configuration with full precedence chain for an open store.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = Storage::read_system_config()?;
    let session = storage.read_config()?;
    Ok(resolve(&system, &session, overrides))
}

/// Resolve configuration for a workspace that may not be initialized yet.
///
/// Without a store only the system config and CLI flags apply.
pub fn resolve_for_workspace(
    workspace: &Path,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    if Storage::exists(workspace)? {
        let storage = Storage::open(workspace)?;
        resolve_config(&storage, overrides)
    } else {
        let system = Storage::read_system_config()?;
        Ok(resolve(&system, &SprConfig::default(), overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_value_source_display() {
        assert_eq!(format!("{}", ValueSource::Session), "session");
        assert_eq!(format!("{}", ValueSource::System), "system");
        assert_eq!(format!("{}", ValueSource::CliFlag), "cli");
        assert_eq!(format!("{}", ValueSource::Default), "default");
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let resolved = resolve(
            &SprConfig::default(),
            &SprConfig::default(),
            &ConfigOverrides::new(),
        );
        assert_eq!(resolved.output_format(), OutputFormat::Json);
        assert_eq!(resolved.output_format.source, ValueSource::Default);
        assert!(resolved.action_log_enabled());
        assert!(resolved.action_log_path().is_none());
    }

    #[test]
    fn test_session_overrides_system() {
        let system = SprConfig {
            output_format: Some(OutputFormat::Human),
            action_log: Some(false),
            action_log_path: Some("/system.log".to_string()),
        };
        let session = SprConfig {
            action_log: Some(true),
            ..Default::default()
        };
        let resolved = resolve(&system, &session, &ConfigOverrides::new());

        assert_eq!(resolved.output_format(), OutputFormat::Human);
        assert_eq!(resolved.output_format.source, ValueSource::System);
        assert!(resolved.action_log_enabled());
        assert_eq!(resolved.action_log.source, ValueSource::Session);
        assert_eq!(resolved.action_log_path(), Some("/system.log"));
    }

    #[test]
    fn test_cli_flag_wins() {
        let session = SprConfig {
            output_format: Some(OutputFormat::Json),
            ..Default::default()
        };
        let overrides = ConfigOverrides::new().with_output_format(OutputFormat::Human);
        let resolved = resolve(&SprConfig::default(), &session, &overrides);
        assert!(resolved.human());
        assert_eq!(resolved.output_format.source, ValueSource::CliFlag);
    }

    #[test]
    fn test_resolve_config_reads_session_file() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let mut config = SprConfig::new();
        config.set("output-format", "human").unwrap();
        storage.write_config(&config).unwrap();

        let resolved = resolve_config(&storage, &ConfigOverrides::new()).unwrap();
        assert!(resolved.human());
        assert_eq!(resolved.output_format.source, ValueSource::Session);
    }
}
