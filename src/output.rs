use crate::history::RemediationLog;
use crate::index::{IndexStore, SyncReport};
use crate::record::{FileRecord, FileStatus};
use crate::remediate::FixReport;
use crate::scanner::ScanReport;
use crate::theme::Theme;
use anyhow::Result;
use serde::Serialize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,       // Only errors
    Normal,      // Standard output
    Verbose,     // Adds pass summaries
    VeryVerbose, // Adds fingerprints and per-file changes
}

#[derive(Serialize)]
struct JsonIndex<'a> {
    version: String,
    timestamp: String,
    root: String,
    signature_source: String,
    files: Vec<JsonRecord<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: &'a str,
    status: FileStatus,
    path: String,
    fingerprint: &'a str,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    safe: usize,
    dangerous: usize,
    not_scanned: usize,
}

/// One line per record in name order
pub fn render_listing(store: &IndexStore, mode: OutputMode) -> String {
    store
        .records()
        .iter()
        .map(|record| render_record(record, mode))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_record(record: &FileRecord, mode: OutputMode) -> String {
    let mut line = format!(
        "Name: {}, status: {}, path: {}",
        Theme::value(record.name()),
        Theme::status(record.status()),
        record.path().display()
    );
    if mode == OutputMode::VeryVerbose {
        line.push_str(&format!(", fingerprint: {}", Theme::muted(record.fingerprint())));
    }
    line
}

pub fn print_human(store: &IndexStore, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    println!();
    println!("{}", Theme::header(&format!("Index of {}", store.root().display())));
    println!("{}", Theme::divider_bold(60));

    if store.is_empty() {
        println!("{}", Theme::muted("No tracked files."));
        return;
    }

    println!("{}", render_listing(store, mode));

    println!("{}", Theme::divider(60));
    println!(
        "{} files: {} safe, {} dangerous, {} not scanned",
        Theme::value(&store.len().to_string()),
        store.count_status(FileStatus::Safe),
        store.count_status(FileStatus::Dangerous),
        store.count_status(FileStatus::NotScanned),
    );
}

pub fn print_json(store: &IndexStore) -> Result<()> {
    let files = store
        .records()
        .iter()
        .map(|record| JsonRecord {
            name: record.name(),
            status: record.status(),
            path: record.path().display().to_string(),
            fingerprint: record.fingerprint(),
        })
        .collect();

    let output = JsonIndex {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        root: store.root().display().to_string(),
        signature_source: store.signatures().source().display().to_string(),
        files,
        summary: JsonSummary {
            total: store.len(),
            safe: store.count_status(FileStatus::Safe),
            dangerous: store.count_status(FileStatus::Dangerous),
            not_scanned: store.count_status(FileStatus::NotScanned),
        },
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_sync_report(report: &SyncReport, mode: OutputMode) {
    if mode != OutputMode::Verbose && mode != OutputMode::VeryVerbose {
        return;
    }

    println!(
        "{} {} removed, {} moved, {} added, {} changed",
        Theme::primary("Sync:"),
        report.removed.len(),
        report.moved.len(),
        report.added.len(),
        report.changed.len()
    );

    if mode == OutputMode::VeryVerbose {
        let groups = [
            ("removed", &report.removed),
            ("moved", &report.moved),
            ("added", &report.added),
            ("changed", &report.changed),
        ];
        for (label, paths) in groups {
            for path in paths {
                println!("  {} {}", Theme::muted(label), path.display());
            }
        }
    }
}

pub fn print_scan_report(report: &ScanReport, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    if report.dangerous > 0 {
        println!(
            "{} {} of {} scanned files contain known signatures",
            Theme::error("Warning:"),
            report.dangerous,
            report.scanned
        );
    }

    if mode == OutputMode::Verbose || mode == OutputMode::VeryVerbose {
        println!(
            "{} {} scanned ({} safe, {} dangerous), {} already classified",
            Theme::primary("Scan:"),
            report.scanned,
            report.safe,
            report.dangerous,
            report.skipped
        );
        for detection in &report.detections {
            println!(
                "  {} {}",
                Theme::warning(&detection.signature),
                detection.path.display()
            );
        }
    }
}

pub fn print_fix_report(report: &FixReport, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    if report.repaired == 0 {
        println!("{}", Theme::success("Nothing to fix."));
    } else {
        println!(
            "{} {} files repaired, {} bytes removed",
            Theme::success("Fixed:"),
            report.repaired,
            report.bytes_removed
        );
    }

    if mode == OutputMode::VeryVerbose {
        for entry in report.entries.iter().filter(|e| e.rewritten) {
            println!(
                "  {} ({} occurrences, {} -> {} bytes)",
                entry.path.display(),
                entry.occurrences_removed,
                entry.bytes_before,
                entry.bytes_after
            );
        }
    }
}

/// Lines describing one saved remediation log
pub fn render_remediation_log(log: &RemediationLog) -> Vec<String> {
    let mut lines = vec![
        format!("Session: {}", log.session_start.format("%Y-%m-%d %H:%M:%S UTC")),
        format!("Root: {}", log.root),
        format!("Signatures: {}", log.signature_source),
        log.summary(),
    ];
    for record in &log.records {
        let action = if record.rewritten { "rewritten" } else { "re-baselined" };
        lines.push(format!(
            "  {} {} ({} -> {} bytes, was {})",
            action, record.path, record.bytes_before, record.bytes_after, record.prior_status
        ));
    }
    lines
}

pub fn print_remediation_log(log: &RemediationLog, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    println!("{}", Theme::header("Remediation log"));
    println!("{}", Theme::divider_bold(60));
    for line in render_remediation_log(log) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::SignatureSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_render_listing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "BADSIG").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "fine").unwrap();

        let signatures = SignatureSet::from_lines("test", ["BADSIG"]).unwrap();
        let mut store = IndexStore::new(temp_dir.path(), signatures).unwrap();
        store.create_index().unwrap();
        store.scan_files_for_viruses().unwrap();

        colored::control::set_override(false);
        let listing = render_listing(&store, OutputMode::Normal);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            format!("Name: a.txt, status: Safe, path: {}", temp_dir.path().join("a.txt").display())
        );
        assert!(lines[1].starts_with("Name: b.txt, status: Dangerous"));
    }

    #[test]
    fn test_render_remediation_log() {
        use crate::history::RemediationRecord;

        let mut log = RemediationLog::new(Path::new("/scan"), Path::new("/sigs.txt"));
        log.add_record(RemediationRecord {
            path: "/scan/a.txt".to_string(),
            prior_status: FileStatus::Dangerous,
            rewritten: true,
            occurrences_removed: 1,
            bytes_before: 13,
            bytes_after: 7,
            old_fingerprint: "aa".to_string(),
            new_fingerprint: "bb".to_string(),
        });

        let lines = render_remediation_log(&log);
        assert_eq!(lines[1], "Root: /scan");
        assert!(lines[3].contains("1 files repaired (6 bytes removed)"));
        assert_eq!(lines[4], "  rewritten /scan/a.txt (13 -> 7 bytes, was Dangerous)");
    }

    #[test]
    fn test_render_listing_empty() {
        let temp_dir = TempDir::new().unwrap();
        let signatures = SignatureSet::from_lines("test", ["BADSIG"]).unwrap();
        let store = IndexStore::new(temp_dir.path(), signatures).unwrap();
        assert_eq!(render_listing(&store, OutputMode::Normal), "");
    }

    #[test]
    fn test_render_listing_very_verbose_shows_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "fine").unwrap();

        let signatures = SignatureSet::from_lines("test", ["BADSIG"]).unwrap();
        let mut store = IndexStore::new(temp_dir.path(), signatures).unwrap();
        store.create_index().unwrap();

        colored::control::set_override(false);
        let fingerprint = store.records()[0].fingerprint().to_string();
        assert!(render_listing(&store, OutputMode::VeryVerbose).ends_with(&format!(", fingerprint: {}", fingerprint)));
        assert!(!render_listing(&store, OutputMode::Normal).contains("fingerprint"));
    }
}
