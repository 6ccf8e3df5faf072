//! Configuration for sprintrecon.
//!
//! Preferences live in `config.kdl` at two levels:
//! - System: `~/.config/sprintrecon/config.kdl`
//! - Session: `<storage root>/config.kdl` (per workspace)
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `action-log` - whether commands are recorded in the action log
//! - `action-log-path` - custom action log location
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve, resolve_config,
    resolve_for_workspace,
};
pub use schema::{CONFIG_KEYS, OutputFormat, SprConfig};
