use crate::error::{EngineError, Result};
use crate::index::IndexStore;
use crate::record::{FileRecord, FileStatus};
use crate::signatures::SignatureSet;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// A file found to contain a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub path: PathBuf,
    pub signature: String,
}

/// Outcome of one classification pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Records classified in this pass
    pub scanned: usize,
    pub safe: usize,
    pub dangerous: usize,
    /// Records skipped because they already had a verdict
    pub skipped: usize,
    pub detections: Vec<Detection>,
}

/// Classify every record still marked `NotScanned`
///
/// Records that are already `Safe` or `Dangerous` keep their verdict until
/// something resets them.
pub fn scan_files_for_viruses(store: &mut IndexStore) -> Result<ScanReport> {
    let (signatures, records) = store.parts_mut();
    let mut report = ScanReport::default();

    for record in records.iter_mut() {
        if record.status() != FileStatus::NotScanned {
            report.skipped += 1;
            continue;
        }

        let hit = classify(record, signatures)?;
        report.scanned += 1;
        match hit {
            Some(signature) => {
                report.dangerous += 1;
                report.detections.push(Detection {
                    path: record.path().to_path_buf(),
                    signature,
                });
            }
            None => report.safe += 1,
        }
    }

    debug!(
        scanned = report.scanned,
        dangerous = report.dangerous,
        skipped = report.skipped,
        "scan pass finished"
    );
    Ok(report)
}

/// Classify a single record from its file's current content
///
/// Signatures are tried in set order and the first hit wins. The status is
/// written exactly once. Returns the matching signature, if any.
pub fn classify(record: &mut FileRecord, signatures: &SignatureSet) -> Result<Option<String>> {
    let content = fs::read_to_string(record.path()).map_err(|e| EngineError::io(record.path(), e))?;

    match signatures.first_match(&content) {
        Some(signature) => {
            info!(path = %record.path().display(), signature, "signature found");
            record.set_status(FileStatus::Dangerous);
            Ok(Some(signature.to_string()))
        }
        None => {
            record.set_status(FileStatus::Safe);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EICAR_3: &str = "AUDIGW*GD*ASYDWQSDAD*DIA^$#@EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

    fn setup(signatures: &[&str]) -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let set = SignatureSet::from_lines("test", signatures.iter().copied()).unwrap();
        let store = IndexStore::new(temp_dir.path(), set).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_scan_file_for_viruses() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file1.txt"), "It is file1.txt file\nIt is safe").unwrap();
        fs::write(
            temp_dir.path().join("file2.txt"),
            format!("It is file2.txt file\nIt is dangerous\n{}", EICAR_3),
        )
        .unwrap();

        let mut store = IndexStore::new(temp_dir.path(), SignatureSet::builtin().unwrap()).unwrap();
        store.create_index().unwrap();
        let report = store.scan_files_for_viruses().unwrap();

        assert_eq!(store.records()[0].status(), FileStatus::Safe);
        assert_eq!(store.records()[1].status(), FileStatus::Dangerous);
        assert_eq!(report.scanned, 2);
        assert_eq!(report.safe, 1);
        assert_eq!(report.dangerous, 1);
        assert_eq!(report.detections[0].signature, EICAR_3);
    }

    #[test]
    fn test_first_signature_in_order_is_reported() {
        let (temp_dir, mut store) = setup(&["FIRST", "SECOND"]);
        fs::write(temp_dir.path().join("a.txt"), "SECOND then FIRST").unwrap();
        store.create_index().unwrap();

        let report = store.scan_files_for_viruses().unwrap();
        assert_eq!(report.detections.len(), 1);
        assert_eq!(report.detections[0].signature, "FIRST");
        assert_eq!(store.get("a.txt").unwrap().status(), FileStatus::Dangerous);
    }

    #[test]
    fn test_match_on_last_signature() {
        // A later signature must still win over earlier misses
        let (temp_dir, mut store) = setup(&["ONE", "TWO", "THREE"]);
        fs::write(temp_dir.path().join("a.txt"), "xx THREE xx").unwrap();
        store.create_index().unwrap();

        store.scan_files_for_viruses().unwrap();
        assert_eq!(store.get("a.txt").unwrap().status(), FileStatus::Dangerous);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        fs::write(temp_dir.path().join("a.txt"), "badsig BadSig").unwrap();
        store.create_index().unwrap();

        store.scan_files_for_viruses().unwrap();
        assert_eq!(store.get("a.txt").unwrap().status(), FileStatus::Safe);
    }

    #[test]
    fn test_classified_records_are_not_rescanned() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "clean").unwrap();
        store.create_index().unwrap();
        store.scan_files_for_viruses().unwrap();

        // Infect without resetting the status: the cached verdict stands
        fs::write(&path, "BADSIG").unwrap();
        let report = store.scan_files_for_viruses().unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.get("a.txt").unwrap().status(), FileStatus::Safe);

        // Once the sync pass notices the edit, it is classified again
        store.update_index().unwrap();
        let report = store.scan_files_for_viruses().unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(store.get("a.txt").unwrap().status(), FileStatus::Dangerous);
    }

    #[test]
    fn test_missing_file_aborts_scan() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "clean").unwrap();
        store.create_index().unwrap();
        fs::remove_file(&path).unwrap();

        let err = store.scan_files_for_viruses().unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
