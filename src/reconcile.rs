//! Three-way reconciliation of planned and reported tasks.
//!
//! Both task lists are indexed by code. Codes in both lists are in progress,
//! codes only planned were not reported, and codes only reported are new.
//! Entries come back sorted by code.
//!
//! Records with a blank code cannot be joined; they are left out and counted.
//! When a code occurs more than once on one side, the record seen last wins
//! and the code is listed as a duplicate.

use crate::models::{
    ComparisonEntry, ComparisonStatus, PlannedSide, PlannedTask, ReportedSide, ReportedTask,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A record that can be joined by task code.
pub trait CodedRecord {
    fn code(&self) -> &str;
}

impl CodedRecord for PlannedTask {
    fn code(&self) -> &str {
        &self.code
    }
}

impl CodedRecord for ReportedTask {
    fn code(&self) -> &str {
        &self.code
    }
}

/// Per-status counts for a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub in_progress: usize,
    pub not_reported: usize,
    pub new: usize,
    pub total: usize,
}

impl StatusSummary {
    /// Count entries by status.
    pub fn from_entries(entries: &[ComparisonEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.status {
                ComparisonStatus::InProgress => summary.in_progress += 1,
                ComparisonStatus::NotReported => summary.not_reported += 1,
                ComparisonStatus::New => summary.new += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Result of classifying one sprint's planned and reported tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// One entry per distinct code, sorted by code
    pub entries: Vec<ComparisonEntry>,

    /// Planned records left out because their code is blank
    pub skipped_planned: usize,

    /// Reported records left out because their code is blank
    pub skipped_reported: usize,

    /// Codes that occur more than once in the planned list
    pub duplicate_planned: Vec<String>,

    /// Codes that occur more than once in the reported list
    pub duplicate_reported: Vec<String>,
}

impl Classification {
    /// Per-status counts.
    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_entries(&self.entries)
    }

    /// Whether any input record was skipped or overwritten.
    pub fn has_warnings(&self) -> bool {
        self.skipped_planned > 0
            || self.skipped_reported > 0
            || !self.duplicate_planned.is_empty()
            || !self.duplicate_reported.is_empty()
    }

    /// Human-readable warnings, one per problem.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.skipped_planned > 0 {
            warnings.push(format!(
                "{} planned task(s) without a code were skipped",
                self.skipped_planned
            ));
        }
        if self.skipped_reported > 0 {
            warnings.push(format!(
                "{} reported task(s) without a code were skipped",
                self.skipped_reported
            ));
        }
        if !self.duplicate_planned.is_empty() {
            warnings.push(format!(
                "duplicate planned code(s), last entry kept: {}",
                self.duplicate_planned.join(", ")
            ));
        }
        if !self.duplicate_reported.is_empty() {
            warnings.push(format!(
                "duplicate reported code(s), last entry kept: {}",
                self.duplicate_reported.join(", ")
            ));
        }
        warnings
    }
}

struct CodeIndex<'a, T> {
    by_code: BTreeMap<&'a str, &'a T>,
    skipped: usize,
    duplicates: BTreeSet<&'a str>,
}

fn index_by_code<T: CodedRecord>(records: &[T]) -> CodeIndex<'_, T> {
    let mut index = CodeIndex {
        by_code: BTreeMap::new(),
        skipped: 0,
        duplicates: BTreeSet::new(),
    };
    for record in records {
        let code = record.code();
        if code.trim().is_empty() {
            index.skipped += 1;
            continue;
        }
        if index.by_code.insert(code, record).is_some() {
            index.duplicates.insert(code);
        }
    }
    index
}

fn owned_codes(codes: BTreeSet<&str>) -> Vec<String> {
    codes.into_iter().map(str::to_string).collect()
}

/// Classify every task code of a sprint.
///
/// Pure: performs no I/O and never fails. Empty inputs produce an empty
/// classification.
pub fn classify(planned: &[PlannedTask], reported: &[ReportedTask]) -> Classification {
    let planned_index = index_by_code(planned);
    let reported_index = index_by_code(reported);

    let codes: BTreeSet<&str> = planned_index
        .by_code
        .keys()
        .chain(reported_index.by_code.keys())
        .copied()
        .collect();

    let entries = codes
        .into_iter()
        .filter_map(|code| {
            let planned = planned_index.by_code.get(code).copied();
            let reported = reported_index.by_code.get(code).copied();
            let (status, planned, reported) = match (planned, reported) {
                (Some(p), Some(r)) => (
                    ComparisonStatus::InProgress,
                    PlannedSide::from(p),
                    ReportedSide::from(r),
                ),
                (Some(p), None) => (
                    ComparisonStatus::NotReported,
                    PlannedSide::from(p),
                    ReportedSide::default(),
                ),
                (None, Some(r)) => (
                    ComparisonStatus::New,
                    PlannedSide::default(),
                    ReportedSide::from(r),
                ),
                (None, None) => return None,
            };
            Some(ComparisonEntry::new(code, status, planned, reported))
        })
        .collect();

    Classification {
        entries,
        skipped_planned: planned_index.skipped,
        skipped_reported: reported_index.skipped,
        duplicate_planned: owned_codes(planned_index.duplicates),
        duplicate_reported: owned_codes(reported_index.duplicates),
    }
}

/// Entries with reasons merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReasonMerge {
    pub entries: Vec<ComparisonEntry>,

    /// Reason codes that matched no entry, sorted
    pub unmatched: Vec<String>,
}

/// Attach a reason to each entry by code.
///
/// Entries whose code has no reason get an empty one.
pub fn attach_reasons(
    entries: Vec<ComparisonEntry>,
    reasons: &BTreeMap<String, String>,
) -> ReasonMerge {
    let entries: Vec<ComparisonEntry> = entries
        .into_iter()
        .map(|mut entry| {
            entry.reason = reasons.get(&entry.code).cloned().unwrap_or_default();
            entry
        })
        .collect();

    let known: BTreeSet<&str> = entries.iter().map(|e| e.code.as_str()).collect();
    let unmatched = reasons
        .keys()
        .filter(|code| !known.contains(code.as_str()))
        .cloned()
        .collect();

    ReasonMerge { entries, unmatched }
}
