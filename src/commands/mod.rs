//! Command implementations for the `spr` CLI.
//!
//! This module contains the business logic for each CLI command. Commands
//! follow the sprint workflow:
//! - `system` - Initialize and maintain the record store
//! - `sprint` - Open and inspect sprints
//! - `planned` / `reported` - Record task lists
//! - `compare` / `finalize` / `report` - Reconcile and persist the final report
//! - `config` - Inspect and change preferences
//!
//! Every per-sprint command takes a [`SprintContext`] and fails with
//! `NotFound` when the sprint has not been opened.

use crate::config::{self, ConfigOverrides, ResolvedConfig};
use crate::intake::{self, PlannedColumns, ReportedColumns};
use crate::models::{
    ComparisonEntry, ComparisonRecord, PlannedTask, ReportedTask, Sprint, SprintContext,
};
use crate::reconcile::{self, StatusSummary};
use crate::storage::{self, CacheCounts, Storage};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Open the store and check that the context's sprint exists.
fn open_sprint_store(workspace: &Path, ctx: &SprintContext) -> Result<Storage> {
    let storage = Storage::open(workspace)?;
    storage.get_sprint(ctx.sprint_id())?;
    Ok(storage)
}

fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

/// One line per entry, plus an indented reason line when present.
fn format_entries(entries: &[ComparisonEntry]) -> String {
    let code_width = entries.iter().map(|e| e.code.len()).max().unwrap_or(0);
    let mut lines = Vec::new();
    for entry in entries {
        let mut line = format!(
            "  {}  {}  {}",
            pad(&entry.code, code_width),
            pad(entry.status.label(), 12),
            entry.display_name()
        );
        if !entry.reported.progress.is_empty() {
            line.push_str(&format!(" ({})", entry.reported.progress));
        }
        lines.push(line.trim_end().to_string());
        if !entry.reason.is_empty() {
            lines.push(format!("      reason: {}", entry.reason));
        }
    }
    lines.join("\n")
}

fn format_summary(sprint_id: &str, summary: &StatusSummary) -> String {
    format!(
        "Sprint {}: {} task code(s) ({} in progress, {} not reported, {} new)",
        sprint_id, summary.total, summary.in_progress, summary.not_reported, summary.new
    )
}

// === System Commands ===

/// Result of `spr system init`.
#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
    /// Present when the cache was missing and rebuilt from existing records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<CacheCounts>,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if let Some(counts) = self.recovered {
            return format!(
                "Recovered store at {}: rebuilt cache from {} sprint(s), {} planned, {} reported, {} comparison entr(ies)",
                self.path, counts.sprints, counts.planned, counts.reported, counts.comparisons
            );
        }
        if self.initialized {
            format!("Initialized sprintrecon store at {}", self.path)
        } else {
            format!("Already initialized at {}", self.path)
        }
    }
}

/// Initialize the record store for a workspace.
///
/// Existing records without a cache are replayed rather than shadowed by an
/// empty one; that case reports `initialized: false`.
pub fn system_init(workspace: &Path) -> Result<InitResult> {
    let already = Storage::exists(workspace)?;
    let storage = if already {
        Storage::open(workspace)?
    } else {
        Storage::init(workspace)?
    };
    let recovered = storage.recovered();
    let initialized = !already && recovered.is_none();
    info!(root = %storage.root().display(), initialized, recovered = recovered.is_some(), "system init");
    Ok(InitResult {
        initialized,
        path: storage.root().display().to_string(),
        recovered,
    })
}

/// Result of `spr system rebuild-cache`.
#[derive(Serialize)]
pub struct RebuildResult {
    pub rebuilt: bool,
    #[serde(flatten)]
    pub counts: CacheCounts,
}

impl Output for RebuildResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Rebuilt cache: {} sprint(s), {} planned, {} reported, {} comparison entr(ies)",
            self.counts.sprints, self.counts.planned, self.counts.reported, self.counts.comparisons
        )
    }
}

/// Rebuild the SQLite cache from the JSONL records.
pub fn system_rebuild_cache(workspace: &Path) -> Result<RebuildResult> {
    let mut storage = Storage::open(workspace)?;
    let counts = storage.rebuild_cache()?;
    info!(?counts, "cache rebuilt");
    Ok(RebuildResult {
        rebuilt: true,
        counts,
    })
}

/// Result of `spr system info`.
#[derive(Serialize)]
pub struct SystemInfo {
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_commit: &'static str,
    pub storage_path: String,
    pub initialized: bool,
}

impl Output for SystemInfo {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "spr {} ({} built {})\nStorage: {}{}",
            self.version,
            self.git_commit,
            self.build_timestamp,
            self.storage_path,
            if self.initialized { "" } else { " (not initialized)" }
        )
    }
}

/// Show build and storage information.
pub fn system_info(workspace: &Path) -> Result<SystemInfo> {
    let data_dir = storage::resolve_data_dir()?;
    let root = storage::get_storage_dir(workspace, &data_dir)?;
    Ok(SystemInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("SPR_BUILD_TIMESTAMP"),
        git_commit: env!("SPR_GIT_COMMIT"),
        storage_path: root.display().to_string(),
        initialized: Storage::exists_with_data_dir(workspace, &data_dir)?,
    })
}

// === Sprint Commands ===

/// Result of `spr sprint open`.
#[derive(Serialize)]
pub struct SprintOpened {
    pub id: String,
    pub created: bool,
    pub created_at: DateTime<Utc>,
}

impl Output for SprintOpened {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Created sprint {}", self.id)
        } else {
            format!("Opened existing sprint {}", self.id)
        }
    }
}

/// Open a sprint, creating it on first use.
pub fn sprint_open(workspace: &Path, id: &str) -> Result<SprintOpened> {
    let ctx = SprintContext::new(id)?;
    let mut storage = Storage::open(workspace)?;

    if let Some(sprint) = storage.find_sprint(ctx.sprint_id())? {
        debug!(sprint = %ctx, "sprint already exists");
        return Ok(SprintOpened {
            id: sprint.id,
            created: false,
            created_at: sprint.created_at,
        });
    }

    let sprint = Sprint::new(ctx.sprint_id().to_string());
    storage.create_sprint(&sprint)?;
    info!(sprint = %ctx, "sprint created");
    Ok(SprintOpened {
        id: sprint.id,
        created: true,
        created_at: sprint.created_at,
    })
}

/// Result of `spr sprint list`.
#[derive(Serialize)]
pub struct SprintList {
    pub sprints: Vec<Sprint>,
    pub count: usize,
}

impl Output for SprintList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.sprints.is_empty() {
            return "No sprints found.".to_string();
        }
        let mut lines = vec![format!("{} sprint(s):", self.count)];
        for sprint in &self.sprints {
            lines.push(format!(
                "  {}  (created {})",
                sprint.id,
                sprint.created_at.format("%Y-%m-%d %H:%M")
            ));
        }
        lines.join("\n")
    }
}

/// List all sprints.
pub fn sprint_list(workspace: &Path) -> Result<SprintList> {
    let storage = Storage::open(workspace)?;
    let sprints = storage.list_sprints()?;
    Ok(SprintList {
        count: sprints.len(),
        sprints,
    })
}

/// Result of `spr sprint show`.
#[derive(Serialize)]
pub struct SprintStatus {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub planned: usize,
    pub reported: usize,
    pub finalized: bool,
}

impl Output for SprintStatus {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Sprint {}\n  planned tasks:  {}\n  reported tasks: {}\n  final report:   {}",
            self.id,
            self.planned,
            self.reported,
            if self.finalized { "saved" } else { "not yet" }
        )
    }
}

/// Show a sprint with its task counts.
pub fn sprint_show(workspace: &Path, ctx: &SprintContext) -> Result<SprintStatus> {
    let storage = Storage::open(workspace)?;
    let sprint = storage.get_sprint(ctx.sprint_id())?;
    let (planned, reported) = storage.count_tasks(ctx.sprint_id())?;
    Ok(SprintStatus {
        id: sprint.id,
        created_at: sprint.created_at,
        planned,
        reported,
        finalized: storage.has_comparison(ctx.sprint_id())?,
    })
}

// === Task Commands ===

/// Result of adding or importing task rows.
#[derive(Serialize)]
pub struct TasksAdded {
    pub sprint_id: String,
    pub kind: &'static str,
    pub added: usize,
    pub missing_code: usize,
}

impl Output for TasksAdded {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Added {} {} task(s) to sprint {}",
            self.added, self.kind, self.sprint_id
        );
        if self.missing_code > 0 {
            out.push_str(&format!(
                "\nWarning: {} row(s) have no code and will be skipped when comparing",
                self.missing_code
            ));
        }
        out
    }
}

fn tasks_added(ctx: &SprintContext, kind: &'static str, codes: &[&str]) -> TasksAdded {
    let missing_code = codes.iter().filter(|c| c.trim().is_empty()).count();
    if missing_code > 0 {
        warn!(sprint = %ctx, kind, missing_code, "rows without a task code");
    }
    info!(sprint = %ctx, kind, added = codes.len(), "tasks recorded");
    TasksAdded {
        sprint_id: ctx.sprint_id().to_string(),
        kind,
        added: codes.len(),
        missing_code,
    }
}

fn store_planned(
    workspace: &Path,
    ctx: &SprintContext,
    rows: Vec<intake::PlannedRow>,
) -> Result<TasksAdded> {
    if rows.is_empty() {
        return Err(Error::InvalidInput("No planned tasks given".to_string()));
    }
    let mut storage = open_sprint_store(workspace, ctx)?;
    let tasks: Vec<PlannedTask> = rows.into_iter().map(|row| row.into_task(ctx)).collect();
    storage.add_planned_tasks(&tasks)?;

    let codes: Vec<&str> = tasks.iter().map(|t| t.code.as_str()).collect();
    Ok(tasks_added(ctx, "planned", &codes))
}

fn store_reported(
    workspace: &Path,
    ctx: &SprintContext,
    rows: Vec<intake::ReportedRow>,
) -> Result<TasksAdded> {
    if rows.is_empty() {
        return Err(Error::InvalidInput("No reported tasks given".to_string()));
    }
    let mut storage = open_sprint_store(workspace, ctx)?;
    let tasks: Vec<ReportedTask> = rows.into_iter().map(|row| row.into_task(ctx)).collect();
    storage.add_reported_tasks(&tasks)?;

    let codes: Vec<&str> = tasks.iter().map(|t| t.code.as_str()).collect();
    Ok(tasks_added(ctx, "reported", &codes))
}

/// Add planned tasks given column by column.
pub fn planned_add(
    workspace: &Path,
    ctx: &SprintContext,
    columns: PlannedColumns,
) -> Result<TasksAdded> {
    store_planned(workspace, ctx, columns.into_rows()?)
}

/// Import planned tasks from a JSON array file (or stdin with `-`).
pub fn planned_import(workspace: &Path, ctx: &SprintContext, source: &str) -> Result<TasksAdded> {
    let rows = intake::parse_planned_json(&intake::read_source(source)?)?;
    store_planned(workspace, ctx, rows)
}

/// Add reported tasks given column by column.
pub fn reported_add(
    workspace: &Path,
    ctx: &SprintContext,
    columns: ReportedColumns,
) -> Result<TasksAdded> {
    store_reported(workspace, ctx, columns.into_rows()?)
}

/// Import reported tasks from a JSON array file (or stdin with `-`).
pub fn reported_import(workspace: &Path, ctx: &SprintContext, source: &str) -> Result<TasksAdded> {
    let rows = intake::parse_reported_json(&intake::read_source(source)?)?;
    store_reported(workspace, ctx, rows)
}

/// Result of `spr planned list`.
#[derive(Serialize)]
pub struct PlannedList {
    pub sprint_id: String,
    pub tasks: Vec<PlannedTask>,
    pub count: usize,
}

impl Output for PlannedList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return format!("No planned tasks for sprint {}.", self.sprint_id);
        }
        let mut lines = vec![format!(
            "{} planned task(s) for sprint {}:",
            self.count, self.sprint_id
        )];
        for t in &self.tasks {
            lines.push(format!(
                "  {}  {}  [{}] starts {}",
                t.code, t.name, t.module, t.start_date
            ));
        }
        lines.join("\n")
    }
}

/// List planned tasks in entry order.
pub fn planned_list(workspace: &Path, ctx: &SprintContext) -> Result<PlannedList> {
    let storage = open_sprint_store(workspace, ctx)?;
    let tasks = storage.list_planned_tasks(ctx.sprint_id())?;
    Ok(PlannedList {
        sprint_id: ctx.sprint_id().to_string(),
        count: tasks.len(),
        tasks,
    })
}

/// Result of `spr reported list`.
#[derive(Serialize)]
pub struct ReportedList {
    pub sprint_id: String,
    pub tasks: Vec<ReportedTask>,
    pub count: usize,
}

impl Output for ReportedList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return format!("No reported tasks for sprint {}.", self.sprint_id);
        }
        let mut lines = vec![format!(
            "{} reported task(s) for sprint {}:",
            self.count, self.sprint_id
        )];
        for t in &self.tasks {
            lines.push(format!(
                "  {}  {}  [{}] {} as of {}",
                t.code, t.name, t.module, t.progress, t.report_date
            ));
        }
        lines.join("\n")
    }
}

/// List reported tasks in entry order.
pub fn reported_list(workspace: &Path, ctx: &SprintContext) -> Result<ReportedList> {
    let storage = open_sprint_store(workspace, ctx)?;
    let tasks = storage.list_reported_tasks(ctx.sprint_id())?;
    Ok(ReportedList {
        sprint_id: ctx.sprint_id().to_string(),
        count: tasks.len(),
        tasks,
    })
}

// === Reconciliation Commands ===

/// Result of `spr compare`.
#[derive(Serialize)]
pub struct CompareResult {
    pub sprint_id: String,
    pub summary: StatusSummary,
    pub entries: Vec<ComparisonEntry>,
    pub skipped_planned: usize,
    pub skipped_reported: usize,
    pub duplicate_planned: Vec<String>,
    pub duplicate_reported: Vec<String>,
    pub warnings: Vec<String>,
    pub finalized: bool,
}

impl Output for CompareResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format_summary(&self.sprint_id, &self.summary);
        if !self.entries.is_empty() {
            out.push('\n');
            out.push_str(&format_entries(&self.entries));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nWarning: {}", warning));
        }
        if self.finalized {
            out.push_str("\nA final report is already saved; see `spr report`.");
        }
        out
    }
}

fn classify_sprint(storage: &Storage, ctx: &SprintContext) -> Result<reconcile::Classification> {
    let planned = storage.list_planned_tasks(ctx.sprint_id())?;
    let reported = storage.list_reported_tasks(ctx.sprint_id())?;
    let classification = reconcile::classify(&planned, &reported);
    for warning in classification.warnings() {
        warn!(sprint = %ctx, "{}", warning);
    }
    Ok(classification)
}

/// Preview the classification of a sprint's tasks.
pub fn compare(workspace: &Path, ctx: &SprintContext) -> Result<CompareResult> {
    let storage = open_sprint_store(workspace, ctx)?;
    let classification = classify_sprint(&storage, ctx)?;
    Ok(CompareResult {
        sprint_id: ctx.sprint_id().to_string(),
        summary: classification.summary(),
        warnings: classification.warnings(),
        entries: classification.entries,
        skipped_planned: classification.skipped_planned,
        skipped_reported: classification.skipped_reported,
        duplicate_planned: classification.duplicate_planned,
        duplicate_reported: classification.duplicate_reported,
        finalized: storage.has_comparison(ctx.sprint_id())?,
    })
}

/// Result of `spr finalize`.
#[derive(Serialize)]
pub struct FinalizeResult {
    pub sprint_id: String,
    pub finalized_at: DateTime<Utc>,
    pub summary: StatusSummary,
    pub entries: Vec<ComparisonEntry>,
    pub unmatched_reasons: Vec<String>,
    pub warnings: Vec<String>,
}

impl Output for FinalizeResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Saved final report. {}",
            format_summary(&self.sprint_id, &self.summary)
        );
        out.push('\n');
        out.push_str(&format_entries(&self.entries));
        if !self.unmatched_reasons.is_empty() {
            out.push_str(&format!(
                "\nWarning: reasons given for unknown code(s): {}",
                self.unmatched_reasons.join(", ")
            ));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nWarning: {}", warning));
        }
        out
    }
}

/// Classify a sprint, attach reasons and save the final report.
pub fn finalize(
    workspace: &Path,
    ctx: &SprintContext,
    reasons: &BTreeMap<String, String>,
) -> Result<FinalizeResult> {
    let mut storage = open_sprint_store(workspace, ctx)?;
    if storage.has_comparison(ctx.sprint_id())? {
        return Err(Error::AlreadyFinalized(ctx.sprint_id().to_string()));
    }

    let classification = classify_sprint(&storage, ctx)?;
    if classification.entries.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Sprint {} has no tasks to compare",
            ctx
        )));
    }
    let warnings = classification.warnings();
    let merged = reconcile::attach_reasons(classification.entries, reasons);
    if !merged.unmatched.is_empty() {
        warn!(sprint = %ctx, unmatched = ?merged.unmatched, "reasons for unknown task codes");
    }

    let finalized_at = Utc::now();
    let records: Vec<ComparisonRecord> = merged
        .entries
        .iter()
        .map(|entry| ComparisonRecord {
            sprint_id: ctx.sprint_id().to_string(),
            finalized_at,
            entry: entry.clone(),
        })
        .collect();
    storage.save_comparison(&records)?;
    info!(sprint = %ctx, entries = records.len(), "final report saved");

    Ok(FinalizeResult {
        sprint_id: ctx.sprint_id().to_string(),
        finalized_at,
        summary: StatusSummary::from_entries(&merged.entries),
        entries: merged.entries,
        unmatched_reasons: merged.unmatched,
        warnings,
    })
}

/// Result of `spr report`.
#[derive(Serialize)]
pub struct ReportResult {
    pub sprint_id: String,
    pub finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    pub summary: StatusSummary,
    pub entries: Vec<ComparisonEntry>,
}

impl Output for ReportResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let Some(finalized_at) = self.finalized_at else {
            return format!(
                "No final report for sprint {} yet. Run `spr finalize` first.",
                self.sprint_id
            );
        };
        format!(
            "{}\nSaved {}\n{}",
            format_summary(&self.sprint_id, &self.summary),
            finalized_at.format("%Y-%m-%d %H:%M"),
            format_entries(&self.entries)
        )
    }
}

/// Show the saved final report of a sprint.
pub fn report(workspace: &Path, ctx: &SprintContext) -> Result<ReportResult> {
    let storage = open_sprint_store(workspace, ctx)?;
    let records = storage.list_comparison(ctx.sprint_id())?;
    let finalized_at = records.first().map(|r| r.finalized_at);
    let entries: Vec<ComparisonEntry> = records.into_iter().map(|r| r.entry).collect();
    Ok(ReportResult {
        sprint_id: ctx.sprint_id().to_string(),
        finalized: finalized_at.is_some(),
        finalized_at,
        summary: StatusSummary::from_entries(&entries),
        entries,
    })
}

// === Config Commands ===

/// Result of `spr config show`.
#[derive(Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_path: Option<String>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![
            format!(
                "output-format    {}  ({})",
                c.output_format.value, c.output_format.source
            ),
            format!(
                "action-log       {}  ({})",
                c.action_log.value, c.action_log.source
            ),
        ];
        match &c.action_log_path {
            Some(path) => lines.push(format!(
                "action-log-path  {}  ({})",
                path.value, path.source
            )),
            None => lines.push("action-log-path  <data dir>/action.log  (default)".to_string()),
        }
        if let Some(ref p) = self.session_path {
            lines.push(format!("session config:  {}", p));
        }
        if let Some(ref p) = self.system_path {
            lines.push(format!("system config:   {}", p));
        }
        lines.join("\n")
    }
}

/// Show the resolved configuration with value sources.
pub fn config_show(workspace: &Path, overrides: &ConfigOverrides) -> Result<ConfigShow> {
    let session_path = if Storage::exists(workspace)? {
        Some(Storage::open(workspace)?.config_kdl_path().display().to_string())
    } else {
        None
    };
    Ok(ConfigShow {
        config: config::resolve_for_workspace(workspace, overrides)?,
        session_path,
        system_path: Storage::system_config_kdl_path().map(|p| p.display().to_string()),
    })
}

/// A single config key and its value.
#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(v) => format!("{} = {}", self.key, v),
            None => format!("{} is not set", self.key),
        }
    }
}

/// Get a value from the workspace's config.kdl.
pub fn config_get(workspace: &Path, key: &str) -> Result<ConfigValue> {
    let storage = Storage::open(workspace)?;
    let value = storage.read_config()?.get(key)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value,
    })
}

/// Set a value in the workspace's config.kdl.
pub fn config_set(workspace: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let storage = Storage::open(workspace)?;
    let mut config = storage.read_config()?;
    config.set(key, value)?;
    storage.write_config(&config)?;
    info!(key, "config updated");
    Ok(ConfigValue {
        key: key.to_string(),
        value: config.get(key)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonStatus, PlannedSide, ReportedSide};

    fn entry(code: &str, status: ComparisonStatus, progress: &str, reason: &str) -> ComparisonEntry {
        let mut e = ComparisonEntry::new(
            code,
            status,
            PlannedSide {
                name: format!("{} planned", code),
                ..Default::default()
            },
            ReportedSide {
                progress: progress.to_string(),
                ..Default::default()
            },
        );
        e.reason = reason.to_string();
        e
    }

    #[test]
    fn test_format_entries_aligns_and_shows_reasons() {
        let text = format_entries(&[
            entry("T1", ComparisonStatus::InProgress, "50%", ""),
            entry("T10", ComparisonStatus::NotReported, "", "Blocked"),
        ]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("  T1   In progress"));
        assert!(lines[0].ends_with("(50%)"));
        assert!(lines[1].contains("Not reported"));
        assert_eq!(lines[2], "      reason: Blocked");
    }

    #[test]
    fn test_report_human_without_report() {
        let result = ReportResult {
            sprint_id: "S1".to_string(),
            finalized: false,
            finalized_at: None,
            summary: StatusSummary::default(),
            entries: Vec::new(),
        };
        assert!(result.to_human().contains("No final report"));
        assert!(result.to_json().contains("\"finalized\":false"));
    }

    #[test]
    fn test_tasks_added_counts_missing_codes() {
        let ctx = SprintContext::new("S1").unwrap();
        let added = tasks_added(&ctx, "planned", &["T1", "", " "]);
        assert_eq!(added.added, 3);
        assert_eq!(added.missing_code, 2);
        assert!(added.to_human().contains("Warning"));
    }
}
