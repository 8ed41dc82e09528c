//! Batch name search over a CSV or JSON names file
//!
//! Supports:
//! - CSV files with one name per line or a "name" column
//! - JSON files with an array of name strings or `{"names": [...]}`
//! - A JSON summary of every name's run written next to the export

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::pipeline::{AbortReason, RunReport};

/// Result of searching a single name in a batch
#[derive(Debug, Clone, Serialize)]
pub struct NameRunResult {
    pub name: String,
    pub records: usize,
    pub diagnostics: usize,
    /// Set when the run ended before enriching any candidate
    pub aborted: Option<AbortReason>,
    /// Set when the run failed outright (dataset error)
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl NameRunResult {
    pub fn from_report(report: &RunReport, duration_secs: f64) -> Self {
        Self {
            name: report.name.clone(),
            records: report.records.len(),
            diagnostics: report.diagnostics.len(),
            aborted: report.abort_reason(),
            error: None,
            duration_secs,
        }
    }

    pub fn failed(name: &str, error: impl ToString, duration_secs: f64) -> Self {
        Self {
            name: name.to_string(),
            records: 0,
            diagnostics: 0,
            aborted: None,
            error: Some(error.to_string()),
            duration_secs,
        }
    }
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_names: usize,
    /// Names whose run produced at least one record
    pub with_records: usize,
    pub aborted: usize,
    pub failed: usize,
    pub total_records: usize,
    pub results: Vec<NameRunResult>,
    pub total_duration_secs: f64,
    pub started_at: String,
    pub completed_at: String,
}

/// Input format for batch names files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("csv") | Some("txt") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse the list of names from a file (format from extension)
pub fn parse_names_file(path: &Path) -> Result<Vec<String>> {
    let format = InputFormat::from_path(path).context(format!(
        "Cannot determine input format from file extension. Expected .csv or .json: {}",
        path.display()
    ))?;

    let content = fs::read_to_string(path).context(format!("Failed to read names file: {}", path.display()))?;

    match format {
        InputFormat::Csv => parse_csv_names(&content),
        InputFormat::Json => parse_json_names(&content),
    }
}

/// Parse names from CSV content
///
/// A first row containing a `name` header selects that column; otherwise
/// every non-empty line is one name. Lines starting with `#` are skipped.
pub fn parse_csv_names(content: &str) -> Result<Vec<String>> {
    let Some(first_line) = content.lines().next() else {
        return Ok(Vec::new());
    };

    let has_header = first_line
        .split(',')
        .any(|h| h.trim().trim_matches('"').eq_ignore_ascii_case("name"));

    if !has_header {
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Failed to read CSV headers")?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("name"))
        .context("CSV must have a 'name' column when using headers")?;

    let mut names = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to parse CSV record")?;
        if let Some(name) = record.get(name_idx).map(str::trim).filter(|s| !s.is_empty()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Parse names from JSON content: `["a", "b"]` or `{"names": ["a", "b"]}`
pub fn parse_json_names(content: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content).context("Failed to parse JSON content")?;

    let items = match &value {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(obj) => match obj.get("names") {
            Some(serde_json::Value::Array(arr)) => arr,
            Some(_) => bail!("'names' field must be an array"),
            None => bail!("JSON object must have a 'names' array field"),
        },
        _ => bail!("JSON must be an array of names or an object with a 'names' field"),
    };

    Ok(items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Export batch summary to JSON file
pub fn export_batch_summary(summary: &BatchSummary, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize batch summary")?;

    fs::write(output_path, json)
        .context(format!("Failed to write batch summary to: {}", output_path.display()))?;

    Ok(())
}

/// Create a new batch summary
pub fn new_batch_summary() -> BatchSummary {
    BatchSummary {
        total_names: 0,
        with_records: 0,
        aborted: 0,
        failed: 0,
        total_records: 0,
        results: Vec::new(),
        total_duration_secs: 0.0,
        started_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        completed_at: String::new(),
    }
}

/// Finalize a batch summary with end time and totals
pub fn finalize_batch_summary(summary: &mut BatchSummary) {
    summary.completed_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    summary.total_names = summary.results.len();
    summary.with_records = summary.results.iter().filter(|r| r.records > 0).count();
    summary.aborted = summary.results.iter().filter(|r| r.aborted.is_some()).count();
    summary.failed = summary.results.iter().filter(|r| r.error.is_some()).count();
    summary.total_records = summary.results.iter().map(|r| r.records).sum();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunOutcome;
    use tempfile::TempDir;

    #[test]
    fn test_parse_csv_one_name_per_line() {
        let names = parse_csv_names("Jane Roe\n  John Doe  \n\n# comment\nAda Lovelace\n").unwrap();
        assert_eq!(names, vec!["Jane Roe", "John Doe", "Ada Lovelace"]);
    }

    #[test]
    fn test_parse_csv_with_name_column() {
        let content = "id,Name,note\n1,Jane Roe,x\n2,,y\n3,\"Doe, John\",z\n";
        let names = parse_csv_names(content).unwrap();
        assert_eq!(names, vec!["Jane Roe", "Doe, John"]);
    }

    #[test]
    fn test_parse_csv_empty() {
        assert!(parse_csv_names("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_json_array_and_object() {
        assert_eq!(parse_json_names(r#"["Jane Roe", " ", 3, "John Doe"]"#).unwrap(), vec!["Jane Roe", "John Doe"]);
        assert_eq!(parse_json_names(r#"{"names": ["Ada"]}"#).unwrap(), vec!["Ada"]);
    }

    #[test]
    fn test_parse_json_invalid_shapes() {
        assert!(parse_json_names(r#"{"people": []}"#).is_err());
        assert!(parse_json_names(r#"{"names": "Ada"}"#).is_err());
        assert!(parse_json_names("42").is_err());
        assert!(parse_json_names("not json").is_err());
    }

    #[test]
    fn test_parse_names_file_detects_format() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("names.json");
        fs::write(&json, r#"["Jane Roe"]"#).unwrap();
        assert_eq!(parse_names_file(&json).unwrap(), vec!["Jane Roe"]);

        let other = dir.path().join("names.xml");
        fs::write(&other, "<names/>").unwrap();
        assert!(parse_names_file(&other).is_err());
    }

    #[test]
    fn test_batch_summary_finalize() {
        let mut summary = new_batch_summary();
        let report = RunReport {
            name: "Nobody".to_string(),
            records: Vec::new(),
            diagnostics: Vec::new(),
            outcome: RunOutcome::Aborted(AbortReason::NoProfilesFound),
        };
        summary.results.push(NameRunResult::from_report(&report, 0.5));
        summary.results.push(NameRunResult::failed("Jane", "missing column", 0.1));

        finalize_batch_summary(&mut summary);
        assert_eq!(summary.total_names, 2);
        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.with_records, 0);
        assert!(!summary.completed_at.is_empty());
    }
}
