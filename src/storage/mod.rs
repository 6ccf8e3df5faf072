//! Storage layer for sprintrecon data.
//!
//! This module handles persistence of sprints, planned tasks, reported tasks
//! and finalized comparison reports.
//!
//! Data lives outside the workspace at `<data dir>/<workspace-hash>/`:
//! - JSONL files for append-only data (sprints.jsonl, planned.jsonl,
//!   reported.jsonl, comparisons.jsonl). These are the source of truth.
//! - SQLite for per-sprint queries (cache.db), rebuildable from the JSONL files
//! - config.kdl for session-level preferences
//!
//! `<data dir>` is `$SPR_DATA_DIR` when set, otherwise the platform data
//! directory joined with `sprintrecon`. The system config.kdl lives in
//! `$SPR_CONFIG_DIR`, falling back to the platform config directory.

use crate::config::SprConfig;
use crate::models::{
    ComparisonEntry, ComparisonRecord, ComparisonStatus, PlannedSide, PlannedTask, ReportedSide,
    ReportedTask, Sprint,
};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SPR_DATA_DIR";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "SPR_CONFIG_DIR";

const SPRINTS_FILE: &str = "sprints.jsonl";
const PLANNED_FILE: &str = "planned.jsonl";
const REPORTED_FILE: &str = "reported.jsonl";
const COMPARISONS_FILE: &str = "comparisons.jsonl";
const CACHE_DB: &str = "cache.db";
const CONFIG_FILE: &str = "config.kdl";

/// Row counts after a cache rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounts {
    pub sprints: usize,
    pub planned: usize,
    pub reported: usize,
    pub comparisons: usize,
}

/// Storage manager for a single workspace.
pub struct Storage {
    /// Root directory for this workspace's data
    pub root: PathBuf,
    /// SQLite connection for indexed queries
    conn: Connection,
    /// Set when init found records without a cache and replayed them
    recovered: Option<CacheCounts>,
}

impl Storage {
    /// Open existing storage for the given workspace.
    pub fn open(workspace: &Path) -> Result<Self> {
        Self::open_with_data_dir(workspace, &resolve_data_dir()?)
    }

    /// Initialize storage for a workspace.
    pub fn init(workspace: &Path) -> Result<Self> {
        Self::init_with_data_dir(workspace, &resolve_data_dir()?)
    }

    /// Check if storage exists for the given workspace.
    pub fn exists(workspace: &Path) -> Result<bool> {
        Self::exists_with_data_dir(workspace, &resolve_data_dir()?)
    }

    /// Open existing storage under an explicit data directory.
    pub fn open_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        let root = get_storage_dir(workspace, data_dir)?;

        if !root.join(CACHE_DB).exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(root.join(CACHE_DB))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root,
            conn,
            recovered: None,
        })
    }

    /// Initialize storage under an explicit data directory.
    ///
    /// A missing cache next to JSONL files that already hold records is
    /// rebuilt from them before returning.
    pub fn init_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        let root = get_storage_dir(workspace, data_dir)?;

        fs::create_dir_all(&root)?;
        let had_cache = root.join(CACHE_DB).exists();

        for file in [SPRINTS_FILE, PLANNED_FILE, REPORTED_FILE, COMPARISONS_FILE] {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        let conn = Connection::open(root.join(CACHE_DB))?;
        Self::init_schema(&conn)?;
        let mut storage = Self {
            root,
            conn,
            recovered: None,
        };

        if !had_cache && storage.has_records()? {
            let counts = storage.rebuild_cache()?;
            warn!(root = %storage.root.display(), ?counts, "cache was missing, rebuilt from records");
            storage.recovered = Some(counts);
        }
        debug!(root = %storage.root.display(), "storage initialized");

        Ok(storage)
    }

    /// Check if storage exists under an explicit data directory.
    pub fn exists_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<bool> {
        let root = get_storage_dir(workspace, data_dir)?;
        Ok(root.join(CACHE_DB).exists())
    }

    /// Counts replayed by init when the cache had to be rebuilt.
    pub fn recovered(&self) -> Option<CacheCounts> {
        self.recovered
    }

    /// Whether any JSONL file holds data.
    fn has_records(&self) -> Result<bool> {
        for file in [SPRINTS_FILE, PLANNED_FILE, REPORTED_FILE, COMPARISONS_FILE] {
            let path = self.root.join(file);
            if path.exists() && fs::metadata(&path)?.len() > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Get the storage root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sprints (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS planned_tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                sprint_id TEXT NOT NULL,
                start_date TEXT NOT NULL,
                module TEXT NOT NULL,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                FOREIGN KEY (sprint_id) REFERENCES sprints(id)
            );

            CREATE TABLE IF NOT EXISTS reported_tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                sprint_id TEXT NOT NULL,
                report_date TEXT NOT NULL,
                module TEXT NOT NULL,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                progress TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                FOREIGN KEY (sprint_id) REFERENCES sprints(id)
            );

            CREATE TABLE IF NOT EXISTS comparisons (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                sprint_id TEXT NOT NULL,
                code TEXT NOT NULL,
                status TEXT NOT NULL,
                reason TEXT NOT NULL,
                start_date TEXT NOT NULL,
                planned_module TEXT NOT NULL,
                planned_name TEXT NOT NULL,
                report_date TEXT NOT NULL,
                reported_module TEXT NOT NULL,
                reported_name TEXT NOT NULL,
                progress TEXT NOT NULL,
                finalized_at TEXT NOT NULL,
                UNIQUE (sprint_id, code),
                FOREIGN KEY (sprint_id) REFERENCES sprints(id)
            );

            CREATE INDEX IF NOT EXISTS idx_planned_sprint ON planned_tasks(sprint_id);
            CREATE INDEX IF NOT EXISTS idx_reported_sprint ON reported_tasks(sprint_id);
            CREATE INDEX IF NOT EXISTS idx_comparisons_sprint ON comparisons(sprint_id);
            "#,
        )?;
        Ok(())
    }

    // === JSONL helpers ===

    fn append_jsonl<T: Serialize>(&self, file: &str, records: &[T]) -> Result<()> {
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(file))?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(out, "{}", json)?;
        }
        Ok(())
    }

    fn read_jsonl<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);

        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(file, line = lineno + 1, error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }

    /// Rebuild the SQLite cache from JSONL files.
    ///
    /// The first sprint line and the first finalized batch per sprint win;
    /// later ones are skipped with a warning.
    pub fn rebuild_cache(&mut self) -> Result<CacheCounts> {
        let sprints: Vec<Sprint> = self.read_jsonl(SPRINTS_FILE)?;
        let planned: Vec<PlannedTask> = self.read_jsonl(PLANNED_FILE)?;
        let reported: Vec<ReportedTask> = self.read_jsonl(REPORTED_FILE)?;
        let comparisons: Vec<ComparisonRecord> = self.read_jsonl(COMPARISONS_FILE)?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r#"
            DELETE FROM comparisons;
            DELETE FROM reported_tasks;
            DELETE FROM planned_tasks;
            DELETE FROM sprints;
            "#,
        )?;
        for sprint in &sprints {
            cache_sprint(&tx, sprint)?;
        }
        for task in &planned {
            cache_planned(&tx, task)?;
        }
        for task in &reported {
            cache_reported(&tx, task)?;
        }
        let mut batches: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut cached_comparisons = 0;
        for record in &comparisons {
            let first = *batches
                .entry(record.sprint_id.as_str())
                .or_insert(record.finalized_at);
            if first != record.finalized_at {
                warn!(
                    sprint = %record.sprint_id,
                    code = %record.entry.code,
                    "skipping record from a later finalize batch"
                );
                continue;
            }
            cache_comparison(&tx, record)?;
            cached_comparisons += 1;
        }
        let cached_sprints: i64 = tx.query_row("SELECT COUNT(*) FROM sprints", [], |row| row.get(0))?;
        tx.commit()?;

        Ok(CacheCounts {
            sprints: cached_sprints as usize,
            planned: planned.len(),
            reported: reported.len(),
            comparisons: cached_comparisons,
        })
    }

    // === Sprint Operations ===

    /// Record a new sprint. Fails if the identifier already exists.
    pub fn create_sprint(&mut self, sprint: &Sprint) -> Result<()> {
        if self.find_sprint(&sprint.id)?.is_some() {
            return Err(Error::InvalidInput(format!(
                "Sprint already exists: {}",
                sprint.id
            )));
        }
        self.append_jsonl(SPRINTS_FILE, std::slice::from_ref(sprint))?;
        cache_sprint(&self.conn, sprint)?;
        Ok(())
    }

    /// Look up a sprint by identifier.
    pub fn find_sprint(&self, id: &str) -> Result<Option<Sprint>> {
        let sprint = self
            .conn
            .query_row(
                "SELECT id, created_at FROM sprints WHERE id = ?",
                [id],
                |row| {
                    Ok(Sprint {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(sprint)
    }

    /// Get a sprint by identifier.
    pub fn get_sprint(&self, id: &str) -> Result<Sprint> {
        self.find_sprint(id)?
            .ok_or_else(|| Error::NotFound(format!("Sprint not found: {}", id)))
    }

    /// List all sprints in creation order.
    pub fn list_sprints(&self) -> Result<Vec<Sprint>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at FROM sprints ORDER BY created_at ASC, id ASC")?;
        let sprints = stmt
            .query_map([], |row| {
                Ok(Sprint {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sprints)
    }

    // === Task Operations ===

    /// Append planned tasks.
    pub fn add_planned_tasks(&mut self, tasks: &[PlannedTask]) -> Result<()> {
        self.append_jsonl(PLANNED_FILE, tasks)?;
        let tx = self.conn.transaction()?;
        for task in tasks {
            cache_planned(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Planned tasks for a sprint, in the order they were recorded.
    pub fn list_planned_tasks(&self, sprint_id: &str) -> Result<Vec<PlannedTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT sprint_id, start_date, module, code, name, recorded_at
             FROM planned_tasks WHERE sprint_id = ? ORDER BY seq ASC",
        )?;
        let tasks = stmt
            .query_map([sprint_id], |row| {
                Ok(PlannedTask {
                    sprint_id: row.get(0)?,
                    start_date: row.get(1)?,
                    module: row.get(2)?,
                    code: row.get(3)?,
                    name: row.get(4)?,
                    recorded_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Append reported tasks.
    pub fn add_reported_tasks(&mut self, tasks: &[ReportedTask]) -> Result<()> {
        self.append_jsonl(REPORTED_FILE, tasks)?;
        let tx = self.conn.transaction()?;
        for task in tasks {
            cache_reported(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Reported tasks for a sprint, in the order they were recorded.
    pub fn list_reported_tasks(&self, sprint_id: &str) -> Result<Vec<ReportedTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT sprint_id, report_date, module, code, name, progress, recorded_at
             FROM reported_tasks WHERE sprint_id = ? ORDER BY seq ASC",
        )?;
        let tasks = stmt
            .query_map([sprint_id], |row| {
                Ok(ReportedTask {
                    sprint_id: row.get(0)?,
                    report_date: row.get(1)?,
                    module: row.get(2)?,
                    code: row.get(3)?,
                    name: row.get(4)?,
                    progress: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Number of planned and reported rows for a sprint.
    pub fn count_tasks(&self, sprint_id: &str) -> Result<(usize, usize)> {
        let planned: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM planned_tasks WHERE sprint_id = ?",
            [sprint_id],
            |row| row.get(0),
        )?;
        let reported: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reported_tasks WHERE sprint_id = ?",
            [sprint_id],
            |row| row.get(0),
        )?;
        Ok((planned as usize, reported as usize))
    }

    // === Comparison Operations ===

    /// Whether a sprint already has a finalized report.
    pub fn has_comparison(&self, sprint_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comparisons WHERE sprint_id = ?",
            [sprint_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Persist a sprint's comparison batch. A sprint is finalized at most once.
    pub fn save_comparison(&mut self, records: &[ComparisonRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        if records.iter().any(|r| r.sprint_id != first.sprint_id) {
            return Err(Error::InvalidInput(
                "A comparison batch must belong to a single sprint".to_string(),
            ));
        }
        if self.has_comparison(&first.sprint_id)? {
            return Err(Error::AlreadyFinalized(first.sprint_id.clone()));
        }

        self.append_jsonl(COMPARISONS_FILE, records)?;
        let tx = self.conn.transaction()?;
        for record in records {
            cache_comparison(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Finalized comparison records for a sprint, sorted by code.
    pub fn list_comparison(&self, sprint_id: &str) -> Result<Vec<ComparisonRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT sprint_id, finalized_at, code, status, reason,
                    start_date, planned_module, planned_name,
                    report_date, reported_module, reported_name, progress
             FROM comparisons WHERE sprint_id = ? ORDER BY code ASC",
        )?;
        let records = stmt
            .query_map([sprint_id], comparison_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    // === Config Operations ===

    /// Path to this workspace's config.kdl.
    pub fn config_kdl_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Read the session config. A missing file yields an empty config.
    pub fn read_config(&self) -> Result<SprConfig> {
        read_config_file(&self.config_kdl_path())
    }

    /// Write the session config.
    pub fn write_config(&self, config: &SprConfig) -> Result<()> {
        fs::write(self.config_kdl_path(), config.to_kdl().to_string())?;
        Ok(())
    }

    /// Path to the system-level config.kdl, if a config directory is known.
    pub fn system_config_kdl_path() -> Option<PathBuf> {
        resolve_config_dir().map(|d| d.join(CONFIG_FILE))
    }

    /// Read the system config. A missing file yields an empty config.
    pub fn read_system_config() -> Result<SprConfig> {
        match Self::system_config_kdl_path() {
            Some(path) => read_config_file(&path),
            None => Ok(SprConfig::default()),
        }
    }
}

fn read_config_file(path: &Path) -> Result<SprConfig> {
    if !path.exists() {
        return Ok(SprConfig::default());
    }
    let text = fs::read_to_string(path)?;
    SprConfig::parse(&text)
}

fn cache_sprint(conn: &Connection, sprint: &Sprint) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sprints (id, created_at) VALUES (?1, ?2)",
        params![sprint.id, sprint.created_at],
    )?;
    Ok(())
}

fn cache_planned(conn: &Connection, task: &PlannedTask) -> Result<()> {
    conn.execute(
        "INSERT INTO planned_tasks (sprint_id, start_date, module, code, name, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.sprint_id,
            task.start_date,
            task.module,
            task.code,
            task.name,
            task.recorded_at,
        ],
    )?;
    Ok(())
}

fn cache_reported(conn: &Connection, task: &ReportedTask) -> Result<()> {
    conn.execute(
        "INSERT INTO reported_tasks (sprint_id, report_date, module, code, name, progress, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            task.sprint_id,
            task.report_date,
            task.module,
            task.code,
            task.name,
            task.progress,
            task.recorded_at,
        ],
    )?;
    Ok(())
}

fn cache_comparison(conn: &Connection, record: &ComparisonRecord) -> Result<()> {
    let entry = &record.entry;
    conn.execute(
        "INSERT OR REPLACE INTO comparisons (
            sprint_id, code, status, reason,
            start_date, planned_module, planned_name,
            report_date, reported_module, reported_name, progress,
            finalized_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.sprint_id,
            entry.code,
            entry.status.as_str(),
            entry.reason,
            entry.planned.start_date,
            entry.planned.module,
            entry.planned.name,
            entry.reported.report_date,
            entry.reported.module,
            entry.reported.name,
            entry.reported.progress,
            record.finalized_at,
        ],
    )?;
    Ok(())
}

fn comparison_from_row(row: &Row<'_>) -> rusqlite::Result<ComparisonRecord> {
    let status_str: String = row.get(3)?;
    let status = ComparisonStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown comparison status: {}", status_str).into(),
        )
    })?;

    Ok(ComparisonRecord {
        sprint_id: row.get(0)?,
        finalized_at: row.get(1)?,
        entry: ComparisonEntry {
            code: row.get(2)?,
            status,
            reason: row.get(4)?,
            planned: PlannedSide {
                start_date: row.get(5)?,
                module: row.get(6)?,
                name: row.get(7)?,
            },
            reported: ReportedSide {
                report_date: row.get(8)?,
                module: row.get(9)?,
                name: row.get(10)?,
                progress: row.get(11)?,
            },
        },
    })
}

/// Resolve the base data directory.
///
/// `$SPR_DATA_DIR` takes precedence over the platform data directory.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("sprintrecon"))
}

/// Resolve the system config directory.
///
/// `$SPR_CONFIG_DIR` takes precedence over the platform config directory.
pub fn resolve_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("sprintrecon")),
    }
}

/// Get the storage directory for a workspace.
///
/// Uses a hash of the canonical workspace path to create a unique directory.
pub fn get_storage_dir(workspace: &Path, data_dir: &Path) -> Result<PathBuf> {
    let canonical = workspace
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize workspace path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());

    Ok(data_dir.join(&hash_hex[..12]))
}
