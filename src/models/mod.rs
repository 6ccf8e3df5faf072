//! Data models for sprint reconciliation.
//!
//! This module defines the core data structures:
//! - `Sprint` - A named work iteration scoping one dataset
//! - `PlannedTask` - A task the team planned for the sprint
//! - `ReportedTask` - A task status reported later in the sprint
//! - `ComparisonEntry` - The reconciled view of one task code
//! - `ComparisonRecord` - A comparison entry as persisted in the final report
//! - `SprintContext` - The explicit sprint scope passed to every step

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validate a sprint identifier.
///
/// Identifiers are free-form (e.g. "2024-S3") but may not be blank.
pub fn validate_sprint_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Sprint identifier must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// A named work iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    /// Unique identifier (e.g., "2024-S3")
    pub id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Sprint {
    /// Create a new sprint with the given identifier.
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
        }
    }
}

/// The sprint a command operates on.
///
/// Built once from the command line and handed to each step explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintContext {
    sprint_id: String,
}

impl SprintContext {
    /// Create a context for the given sprint identifier.
    pub fn new(sprint_id: impl Into<String>) -> Result<Self> {
        let sprint_id = sprint_id.into();
        validate_sprint_id(&sprint_id)?;
        Ok(Self { sprint_id })
    }

    /// The sprint identifier this context is scoped to.
    pub fn sprint_id(&self) -> &str {
        &self.sprint_id
    }
}

impl fmt::Display for SprintContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sprint_id)
    }
}

/// A task the team planned at the start of a sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Owning sprint identifier
    pub sprint_id: String,

    /// Planned start date, as entered
    #[serde(default)]
    pub start_date: String,

    /// Module or area the task belongs to
    #[serde(default)]
    pub module: String,

    /// Task code (join key)
    #[serde(default)]
    pub code: String,

    /// Task name
    #[serde(default)]
    pub name: String,

    /// When the row was recorded
    pub recorded_at: DateTime<Utc>,
}

impl PlannedTask {
    /// Create a planned task for the given sprint.
    pub fn new(
        sprint_id: impl Into<String>,
        start_date: impl Into<String>,
        module: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            sprint_id: sprint_id.into(),
            start_date: start_date.into(),
            module: module.into(),
            code: code.into(),
            name: name.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// A task status reported during or after a sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedTask {
    /// Owning sprint identifier
    pub sprint_id: String,

    /// Report date, as entered
    #[serde(default)]
    pub report_date: String,

    /// Module or area the task belongs to
    #[serde(default)]
    pub module: String,

    /// Task code (join key)
    #[serde(default)]
    pub code: String,

    /// Task name
    #[serde(default)]
    pub name: String,

    /// Free-form progress (e.g., "50%")
    #[serde(default)]
    pub progress: String,

    /// When the row was recorded
    pub recorded_at: DateTime<Utc>,
}

impl ReportedTask {
    /// Create a reported task for the given sprint.
    pub fn new(
        sprint_id: impl Into<String>,
        report_date: impl Into<String>,
        module: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
        progress: impl Into<String>,
    ) -> Self {
        Self {
            sprint_id: sprint_id.into(),
            report_date: report_date.into(),
            module: module.into(),
            code: code.into(),
            name: name.into(),
            progress: progress.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Classification of a task code after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Planned and reported
    InProgress,
    /// Planned but never reported
    NotReported,
    /// Reported without having been planned
    New,
}

impl ComparisonStatus {
    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "not_reported" => Some(Self::NotReported),
            "new" => Some(Self::New),
            _ => None,
        }
    }

    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::NotReported => "not_reported",
            Self::New => "new",
        }
    }

    /// Label used in human-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "In progress",
            Self::NotReported => "Not reported",
            Self::New => "New",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Planned-side copy carried by a comparison entry.
///
/// All fields are empty when the code was never planned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSide {
    pub start_date: String,
    pub module: String,
    pub name: String,
}

impl PlannedSide {
    /// Whether this side is an empty placeholder.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_empty() && self.module.is_empty() && self.name.is_empty()
    }
}

impl From<&PlannedTask> for PlannedSide {
    fn from(task: &PlannedTask) -> Self {
        Self {
            start_date: task.start_date.clone(),
            module: task.module.clone(),
            name: task.name.clone(),
        }
    }
}

/// Reported-side copy carried by a comparison entry.
///
/// All fields are empty when the code was never reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedSide {
    pub report_date: String,
    pub module: String,
    pub name: String,
    pub progress: String,
}

impl ReportedSide {
    /// Whether this side is an empty placeholder.
    pub fn is_empty(&self) -> bool {
        self.report_date.is_empty()
            && self.module.is_empty()
            && self.name.is_empty()
            && self.progress.is_empty()
    }
}

impl From<&ReportedTask> for ReportedSide {
    fn from(task: &ReportedTask) -> Self {
        Self {
            report_date: task.report_date.clone(),
            module: task.module.clone(),
            name: task.name.clone(),
            progress: task.progress.clone(),
        }
    }
}

/// The reconciled view of one task code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Task code (join key)
    pub code: String,

    /// Classification
    pub status: ComparisonStatus,

    /// Free-text justification, empty until supplied
    #[serde(default)]
    pub reason: String,

    /// Copy of the planned record, if any
    #[serde(default)]
    pub planned: PlannedSide,

    /// Copy of the reported record, if any
    #[serde(default)]
    pub reported: ReportedSide,
}

impl ComparisonEntry {
    /// Create an entry with an empty reason.
    pub fn new(
        code: impl Into<String>,
        status: ComparisonStatus,
        planned: PlannedSide,
        reported: ReportedSide,
    ) -> Self {
        Self {
            code: code.into(),
            status,
            reason: String::new(),
            planned,
            reported,
        }
    }

    /// Display name, preferring the reported name over the planned one.
    pub fn display_name(&self) -> &str {
        if self.reported.name.is_empty() {
            &self.planned.name
        } else {
            &self.reported.name
        }
    }
}

/// A comparison entry persisted as part of a sprint's final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Owning sprint identifier
    pub sprint_id: String,

    /// When the report batch was written
    pub finalized_at: DateTime<Utc>,

    #[serde(flatten)]
    pub entry: ComparisonEntry,
}
