//! Input boundary for task rows.
//!
//! Rows arrive either as a JSON array of records or as columns (one list per
//! field, as given by repeated CLI flags). Columns are checked for equal
//! length before any row is built. A column that is omitted entirely is
//! filled with empty values.

use crate::models::{PlannedTask, ReportedTask, SprintContext};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One planned task as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlannedRow {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl PlannedRow {
    /// Build the stored record for the given sprint.
    pub fn into_task(self, ctx: &SprintContext) -> PlannedTask {
        PlannedTask::new(
            ctx.sprint_id(),
            self.start_date,
            self.module,
            self.code,
            self.name,
        )
    }
}

/// One reported task as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportedRow {
    #[serde(default)]
    pub report_date: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub progress: String,
}

impl ReportedRow {
    /// Build the stored record for the given sprint.
    pub fn into_task(self, ctx: &SprintContext) -> ReportedTask {
        ReportedTask::new(
            ctx.sprint_id(),
            self.report_date,
            self.module,
            self.code,
            self.name,
            self.progress,
        )
    }
}

/// Determine the row count for a set of named columns.
///
/// Every non-empty column must have the same length.
fn row_count(columns: &[(&str, usize)]) -> Result<usize> {
    let rows = columns.iter().map(|(_, len)| *len).max().unwrap_or(0);
    let mismatched = columns
        .iter()
        .any(|(_, len)| *len != 0 && *len != rows);
    if mismatched {
        let lengths: Vec<String> = columns
            .iter()
            .map(|(name, len)| format!("{}={}", name, len))
            .collect();
        return Err(Error::InvalidInput(format!(
            "Column lengths differ: {}",
            lengths.join(", ")
        )));
    }
    Ok(rows)
}

fn take_or_blank(column: &mut std::vec::IntoIter<String>) -> String {
    column.next().unwrap_or_default()
}

/// Planned tasks given column by column.
#[derive(Debug, Clone, Default)]
pub struct PlannedColumns {
    pub start_date: Vec<String>,
    pub module: Vec<String>,
    pub code: Vec<String>,
    pub name: Vec<String>,
}

impl PlannedColumns {
    /// Validate column lengths and zip the columns into rows.
    pub fn into_rows(self) -> Result<Vec<PlannedRow>> {
        let rows = row_count(&[
            ("start_date", self.start_date.len()),
            ("module", self.module.len()),
            ("code", self.code.len()),
            ("name", self.name.len()),
        ])?;

        let mut start_date = self.start_date.into_iter();
        let mut module = self.module.into_iter();
        let mut code = self.code.into_iter();
        let mut name = self.name.into_iter();

        Ok((0..rows)
            .map(|_| PlannedRow {
                start_date: take_or_blank(&mut start_date),
                module: take_or_blank(&mut module),
                code: take_or_blank(&mut code),
                name: take_or_blank(&mut name),
            })
            .collect())
    }
}

/// Reported tasks given column by column.
#[derive(Debug, Clone, Default)]
pub struct ReportedColumns {
    pub report_date: Vec<String>,
    pub module: Vec<String>,
    pub code: Vec<String>,
    pub name: Vec<String>,
    pub progress: Vec<String>,
}

impl ReportedColumns {
    /// Validate column lengths and zip the columns into rows.
    pub fn into_rows(self) -> Result<Vec<ReportedRow>> {
        let rows = row_count(&[
            ("report_date", self.report_date.len()),
            ("module", self.module.len()),
            ("code", self.code.len()),
            ("name", self.name.len()),
            ("progress", self.progress.len()),
        ])?;

        let mut report_date = self.report_date.into_iter();
        let mut module = self.module.into_iter();
        let mut code = self.code.into_iter();
        let mut name = self.name.into_iter();
        let mut progress = self.progress.into_iter();

        Ok((0..rows)
            .map(|_| ReportedRow {
                report_date: take_or_blank(&mut report_date),
                module: take_or_blank(&mut module),
                code: take_or_blank(&mut code),
                name: take_or_blank(&mut name),
                progress: take_or_blank(&mut progress),
            })
            .collect())
    }
}

/// Parse a JSON array of planned rows.
pub fn parse_planned_json(input: &str) -> Result<Vec<PlannedRow>> {
    Ok(serde_json::from_str(input)?)
}

/// Parse a JSON array of reported rows.
pub fn parse_reported_json(input: &str) -> Result<Vec<ReportedRow>> {
    Ok(serde_json::from_str(input)?)
}

/// Read input text from a file path, or from stdin when the source is `-`.
pub fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    let path = Path::new(source);
    if !path.exists() {
        return Err(Error::NotFound(format!("Input file not found: {}", source)));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Parse a `CODE=TEXT` reason argument.
pub fn parse_reason_arg(arg: &str) -> Result<(String, String)> {
    let (code, reason) = arg.split_once('=').ok_or_else(|| {
        Error::InvalidInput(format!("Reason must be given as CODE=TEXT, got: {}", arg))
    })?;
    if code.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "Reason is missing a task code: {}",
            arg
        )));
    }
    Ok((code.to_string(), reason.to_string()))
}

/// Collect reasons from `CODE=TEXT` arguments and an optional JSON object file.
///
/// Command-line arguments override entries from the file.
pub fn collect_reasons(
    args: &[String],
    file: Option<&Path>,
) -> Result<BTreeMap<String, String>> {
    let mut reasons = match file {
        Some(path) => {
            let path_str = path.to_string_lossy();
            let text = read_source(&path_str)?;
            serde_json::from_str::<BTreeMap<String, String>>(&text)?
        }
        None => BTreeMap::new(),
    };
    for arg in args {
        let (code, reason) = parse_reason_arg(arg)?;
        reasons.insert(code, reason);
    }
    Ok(reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_planned_columns_zip_into_rows() {
        let columns = PlannedColumns {
            start_date: strings(&["2024-05-01", "2024-05-02"]),
            module: strings(&["api", "web"]),
            code: strings(&["T1", "T2"]),
            name: strings(&["Login", "Dashboard"]),
        };
        let rows = columns.into_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].code, "T2");
        assert_eq!(rows[1].module, "web");
    }

    #[test]
    fn test_omitted_column_is_blank_filled() {
        let columns = PlannedColumns {
            code: strings(&["T1", "T2"]),
            name: strings(&["Login", "Dashboard"]),
            ..Default::default()
        };
        let rows = columns.into_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].start_date, "");
        assert_eq!(rows[0].module, "");
    }

    #[test]
    fn test_unequal_columns_are_rejected() {
        let columns = ReportedColumns {
            code: strings(&["T1", "T2"]),
            progress: strings(&["50%"]),
            ..Default::default()
        };
        let err = columns.into_rows().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code=2"));
        assert!(msg.contains("progress=1"));
    }

    #[test]
    fn test_no_columns_means_no_rows() {
        assert!(PlannedColumns::default().into_rows().unwrap().is_empty());
    }

    #[test]
    fn test_parse_reported_json_fills_missing_fields() {
        let rows =
            parse_reported_json(r#"[{"code": "T1", "progress": "50%"}, {"name": "no code"}]"#)
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].progress, "50%");
        assert_eq!(rows[0].report_date, "");
        assert_eq!(rows[1].code, "");
    }

    #[test]
    fn test_parse_planned_json_rejects_non_array() {
        assert!(parse_planned_json(r#"{"code": "T1"}"#).is_err());
    }

    #[test]
    fn test_rows_take_sprint_from_context() {
        let ctx = SprintContext::new("2024-S3").unwrap();
        let task = PlannedRow {
            code: "T1".to_string(),
            ..Default::default()
        }
        .into_task(&ctx);
        assert_eq!(task.sprint_id, "2024-S3");
        assert_eq!(task.code, "T1");
    }

    #[test]
    fn test_parse_reason_arg() {
        assert_eq!(
            parse_reason_arg("T1=Waiting on review").unwrap(),
            ("T1".to_string(), "Waiting on review".to_string())
        );
        assert_eq!(
            parse_reason_arg("T1=a=b").unwrap(),
            ("T1".to_string(), "a=b".to_string())
        );
        assert!(parse_reason_arg("no separator").is_err());
        assert!(parse_reason_arg("=text").is_err());
    }

    #[test]
    fn test_collect_reasons_args_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"T1": "from file", "T2": "also file"}}"#).unwrap();

        let reasons =
            collect_reasons(&strings(&["T1=from flag"]), Some(file.path())).unwrap();
        assert_eq!(reasons["T1"], "from flag");
        assert_eq!(reasons["T2"], "also file");
    }

    #[test]
    fn test_read_source_missing_file() {
        let err = read_source("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
