//! Report snapshot and append-only history for enrichment runs.
use crate::pipeline::{RunStatus, RunSummary};
use crate::store;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

/// Latest run snapshot written by `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u128,
    pub dataset: PathBuf,
    pub providers: Vec<String>,
    pub summary: RunSummary,
}

/// One line of the `--history` JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    pub schema_version: u32,
    pub started_at_epoch_ms: u128,
    pub finished_at_epoch_ms: u128,
    pub dataset: PathBuf,
    pub status: Option<RunStatus>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub found: usize,
    pub lost: usize,
    pub last_index: usize,
    pub writes: usize,
    pub success: bool,
    pub message: Option<String>,
}

impl RunHistoryEntry {
    /// Entry for a run that returned a summary.
    pub fn completed(
        dataset: &Path,
        started_at_epoch_ms: u128,
        finished_at_epoch_ms: u128,
        summary: &RunSummary,
    ) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            started_at_epoch_ms,
            finished_at_epoch_ms,
            dataset: dataset.to_path_buf(),
            status: Some(summary.status),
            start: Some(summary.start),
            end: Some(summary.end),
            found: summary.found,
            lost: summary.lost,
            last_index: summary.last_index,
            writes: summary.writes,
            success: true,
            message: None,
        }
    }

    /// Entry for a run that ended with a fatal error.
    pub fn failed(
        dataset: &Path,
        started_at_epoch_ms: u128,
        finished_at_epoch_ms: u128,
        message: String,
    ) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            started_at_epoch_ms,
            finished_at_epoch_ms,
            dataset: dataset.to_path_buf(),
            status: None,
            start: None,
            end: None,
            found: 0,
            lost: 0,
            last_index: 0,
            writes: 0,
            success: false,
            message: Some(message),
        }
    }
}

/// Write the report snapshot atomically.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    store::write_json_atomic(path, report)
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

/// Append a history entry as JSONL.
pub fn append_history(path: &Path, entry: &RunHistoryEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize run history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            status: RunStatus::Interrupted,
            start: 1,
            end: 3,
            found: 1,
            lost: 1,
            skipped: 0,
            backfilled: 0,
            processed: 2,
            last_index: 2,
            writes: 1,
        }
    }

    #[test]
    fn history_appends_one_line_per_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/history.jsonl");
        let dataset = Path::new("cars.json");

        append_history(&path, &RunHistoryEntry::completed(dataset, 10, 20, &summary()))
            .expect("append first");
        append_history(
            &path,
            &RunHistoryEntry::failed(dataset, 30, 31, "dataset locked".to_string()),
        )
        .expect("append second");

        let text = std::fs::read_to_string(&path).expect("read history");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: RunHistoryEntry = serde_json::from_str(lines[0]).expect("parse first");
        assert_eq!(first.status, Some(RunStatus::Interrupted));
        assert_eq!((first.found, first.last_index), (1, 2));
        assert!(first.success);
        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("parse second");
        assert_eq!(second["success"], false);
        assert_eq!(second["message"], "dataset locked");
    }

    #[test]
    fn report_is_pretty_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        let report = RunReport {
            schema_version: HISTORY_SCHEMA_VERSION,
            generated_at_epoch_ms: 42,
            dataset: PathBuf::from("cars.json"),
            providers: vec!["duckduckgo".to_string()],
            summary: summary(),
        };

        write_report(&path, &report).expect("write report");

        let text = std::fs::read_to_string(&path).expect("read report");
        assert!(text.contains("\n  \"summary\": {"));
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse report");
        assert_eq!(value["summary"]["status"], "interrupted");
    }
}
