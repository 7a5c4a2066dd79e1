//! Remediation history logging for audit trails
//!
//! Every fix pass can be saved as a JSON log recording which files were
//! rewritten and how their fingerprints moved. There is no undo: the logs are
//! a record, not a backup.

use crate::remediate::{FixEntry, FixReport};
use crate::record::FileStatus;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Record of a single file touched by a fix pass
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemediationRecord {
    /// Path of the file
    pub path: String,
    /// Status before the fix pass
    pub prior_status: FileStatus,
    /// Whether the content was rewritten
    pub rewritten: bool,
    /// Signature occurrences removed
    pub occurrences_removed: usize,
    /// Size in bytes before the fix
    pub bytes_before: u64,
    /// Size in bytes after the fix
    pub bytes_after: u64,
    pub old_fingerprint: String,
    pub new_fingerprint: String,
}

impl From<&FixEntry> for RemediationRecord {
    fn from(entry: &FixEntry) -> Self {
        Self {
            path: entry.path.display().to_string(),
            prior_status: entry.prior_status,
            rewritten: entry.rewritten,
            occurrences_removed: entry.occurrences_removed,
            bytes_before: entry.bytes_before,
            bytes_after: entry.bytes_after,
            old_fingerprint: entry.old_fingerprint.clone(),
            new_fingerprint: entry.new_fingerprint.clone(),
        }
    }
}

/// Log of one fix pass
#[derive(Serialize, Deserialize, Debug)]
pub struct RemediationLog {
    /// When this session started
    #[serde(with = "chrono::serde::ts_seconds")]
    pub session_start: DateTime<Utc>,
    /// Root directory of the index
    pub root: String,
    /// Signature source used for the pass
    pub signature_source: String,
    pub records: Vec<RemediationRecord>,
    /// Files rewritten
    pub total_rewritten: usize,
    /// Bytes stripped across all files
    pub total_bytes_removed: u64,
}

impl RemediationLog {
    /// Create a new log for the current session
    pub fn new(root: &Path, signature_source: &Path) -> Self {
        Self {
            session_start: Utc::now(),
            root: root.display().to_string(),
            signature_source: signature_source.display().to_string(),
            records: Vec::new(),
            total_rewritten: 0,
            total_bytes_removed: 0,
        }
    }

    /// Add a record to the log
    pub fn add_record(&mut self, record: RemediationRecord) {
        if record.rewritten {
            self.total_rewritten += 1;
            self.total_bytes_removed += record.bytes_before - record.bytes_after;
        }
        self.records.push(record);
    }

    /// Add every entry of a fix report
    pub fn extend_from_report(&mut self, report: &FixReport) {
        for entry in &report.entries {
            self.add_record(RemediationRecord::from(entry));
        }
    }

    /// Save the log to the history directory
    ///
    /// Returns the path to the saved log file
    pub fn save(&self) -> Result<PathBuf> {
        let history_dir = get_history_dir()?;
        self.save_to(&history_dir)
    }

    /// Save the log into `dir`
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;
        }

        // Create filename with timestamp
        let filename = format!(
            "remediation_{}.json",
            self.session_start.format("%Y%m%d_%H%M%S")
        );
        let log_path = dir.join(filename);

        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize remediation log")?;

        fs::write(&log_path, json)
            .with_context(|| format!("Failed to write remediation log to {}", log_path.display()))?;

        Ok(log_path)
    }

    /// Get the summary message for this log
    pub fn summary(&self) -> String {
        format!(
            "{} files repaired ({} bytes removed), {} records re-baselined",
            self.total_rewritten,
            self.total_bytes_removed,
            self.records.len()
        )
    }
}

/// Get the history directory path
///
/// Creates the directory if it doesn't exist
/// Location: the platform data directory, e.g. ~/.local/share/sigguard/history/
pub fn get_history_dir() -> Result<PathBuf> {
    let history_dir = directories::ProjectDirs::from("", "", "sigguard")
        .map(|dirs| dirs.data_dir().join("history"))
        .context("Could not determine a data directory for remediation history")?;

    if !history_dir.exists() {
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("Failed to create history directory: {}", history_dir.display()))?;
    }

    Ok(history_dir)
}

/// List all history log files in the history directory, newest first
pub fn list_logs() -> Result<Vec<PathBuf>> {
    list_logs_in(&get_history_dir()?)
}

/// List log files in `dir`, newest first
pub fn list_logs_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read history directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
        .collect();

    // Filenames embed the timestamp
    logs.sort();
    logs.reverse();

    Ok(logs)
}

/// Load a remediation log from a file
pub fn load_log(path: &Path) -> Result<RemediationLog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file: {}", path.display()))?;

    let log: RemediationLog = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse log file: {}", path.display()))?;

    Ok(log)
}
