//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Key-based get/set used by `spr config`

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &["output-format", "action-log", "action-log-path"];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// action-log #true
/// action-log-path "~/logs/spr-action.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Whether every command is written to the action log
    pub action_log: Option<bool>,

    /// Custom action log location
    pub action_log_path: Option<String>,
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl SprConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from KDL text.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text.parse()?;
        Ok(Self::from_kdl(&doc))
    }

    /// Parse config from a KDL document. Unknown nodes and bad values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_value(doc, "output-format").and_then(|v| v.as_string()) {
            config.output_format = OutputFormat::parse(s);
        }

        // Accept both a KDL boolean and a quoted "true"/"false"
        if let Some(value) = first_value(doc, "action-log") {
            config.action_log = value
                .as_bool()
                .or_else(|| value.as_string().and_then(parse_bool));
        }

        if let Some(s) = first_value(doc, "action-log-path").and_then(|v| v.as_string()) {
            config.action_log_path = Some(s.to_string());
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref path) = self.action_log_path {
            let mut node = KdlNode::new("action-log-path");
            node.push(KdlEntry::new(KdlValue::String(path.clone())));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &SprConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
        if other.action_log_path.is_some() {
            self.action_log_path = other.action_log_path.clone();
        }
    }

    /// Get a value by its KDL key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match key {
            "output-format" => Ok(self.output_format.map(|f| f.as_str().to_string())),
            "action-log" => Ok(self.action_log.map(|b| b.to_string())),
            "action-log-path" => Ok(self.action_log_path.clone()),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set a value by its KDL key, validating it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "output-format must be \"json\" or \"human\", got: {}",
                        value
                    ))
                })?;
                self.output_format = Some(format);
            }
            "action-log" => {
                let enabled = parse_bool(value).ok_or_else(|| {
                    Error::InvalidInput(format!("action-log must be true or false, got: {}", value))
                })?;
                self.action_log = Some(enabled);
            }
            "action-log-path" => {
                if value.trim().is_empty() {
                    return Err(Error::InvalidInput(
                        "action-log-path must not be empty".to_string(),
                    ));
                }
                self.action_log_path = Some(value.to_string());
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> Error {
    Error::InvalidInput(format!(
        "Unknown config key: {} (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}
