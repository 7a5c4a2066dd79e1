//! Signature removal for infected files
//!
//! Rewrites are in place with no backup copy. A failure halfway through a
//! pass leaves earlier files rewritten and later ones untouched.

use crate::error::{EngineError, Result};
use crate::index::IndexStore;
use crate::record::FileStatus;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// What happened to one record during a fix pass
#[derive(Debug, Clone, Serialize)]
pub struct FixEntry {
    pub name: String,
    pub path: PathBuf,
    pub prior_status: FileStatus,
    pub rewritten: bool,
    pub occurrences_removed: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub old_fingerprint: String,
    pub new_fingerprint: String,
}

/// Outcome of one fix pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    /// Files whose content was rewritten
    pub repaired: usize,
    /// Records whose fingerprint and status were refreshed (all of them)
    pub rebaselined: usize,
    pub bytes_removed: u64,
    pub entries: Vec<FixEntry>,
}

/// Strip signatures from every `Dangerous` file, then re-baseline the index
///
/// Every record, infected or not, ends with a fingerprint of its current
/// on-disk content and status `Safe`.
pub fn fix_infected_files(store: &mut IndexStore) -> Result<FixReport> {
    let (signatures, records) = store.parts_mut();
    let mut report = FixReport::default();

    for record in records.iter_mut() {
        let prior_status = record.status();
        let old_fingerprint = record.fingerprint().to_string();
        let mut entry_bytes = None;
        let mut occurrences_removed = 0;

        if prior_status == FileStatus::Dangerous {
            let path = record.path().to_path_buf();
            let content = fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
            let (cleaned, removed) = signatures.strip(&content);
            fs::write(&path, &cleaned).map_err(|e| EngineError::io(&path, e))?;

            debug!(path = %path.display(), removed, "signatures stripped");
            occurrences_removed = removed;
            entry_bytes = Some((content.len() as u64, cleaned.len() as u64));
            report.repaired += 1;
        }

        record.refresh_fingerprint()?;
        record.set_status(FileStatus::Safe);
        report.rebaselined += 1;

        let (bytes_before, bytes_after) = match entry_bytes {
            Some(sizes) => sizes,
            None => {
                let len = fs::metadata(record.path())
                    .map_err(|e| EngineError::io(record.path(), e))?
                    .len();
                (len, len)
            }
        };
        report.bytes_removed += bytes_before - bytes_after;

        report.entries.push(FixEntry {
            name: record.name().to_string(),
            path: record.path().to_path_buf(),
            prior_status,
            rewritten: entry_bytes.is_some(),
            occurrences_removed,
            bytes_before,
            bytes_after,
            old_fingerprint,
            new_fingerprint: record.fingerprint().to_string(),
        });
    }

    info!(
        repaired = report.repaired,
        rebaselined = report.rebaselined,
        bytes_removed = report.bytes_removed,
        "fix pass finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use crate::signatures::SignatureSet;
    use tempfile::TempDir;

    const EICAR_3: &str = "AUDIGW*GD*ASYDWQSDAD*DIA^$#@EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

    fn setup(signatures: &[&str]) -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let set = SignatureSet::from_lines("test", signatures.iter().copied()).unwrap();
        let store = IndexStore::new(temp_dir.path(), set).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_badsig_scenario() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "hello\nBADSIG\n").unwrap();

        store.create_index().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].status(), FileStatus::NotScanned);
        let original_fp = store.records()[0].fingerprint().to_string();

        store.scan_files_for_viruses().unwrap();
        assert_eq!(store.records()[0].status(), FileStatus::Dangerous);

        let report = store.fix_infected_files().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n\n");
        assert_eq!(store.records()[0].status(), FileStatus::Safe);
        assert_ne!(store.records()[0].fingerprint(), original_fp);
        assert_eq!(store.records()[0].fingerprint(), fingerprint_bytes(b"hello\n\n"));
        assert_eq!(report.repaired, 1);
        assert_eq!(report.bytes_removed, 6);
    }

    #[test]
    fn test_fix_infected_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file1.txt");
        fs::write(
            &path,
            format!(
                "It is file1.txt file\nAfter fixing virus will be deleted\n{}",
                EICAR_3
            ),
        )
        .unwrap();

        let mut store = IndexStore::new(temp_dir.path(), SignatureSet::builtin().unwrap()).unwrap();
        store.create_index().unwrap();
        store.scan_files_for_viruses().unwrap();
        assert_eq!(store.records()[0].status(), FileStatus::Dangerous);

        store.fix_infected_files().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "It is file1.txt file\nAfter fixing virus will be deleted\n"
        );
        assert_eq!(store.records()[0].status(), FileStatus::Safe);
    }

    #[test]
    fn test_fix_rebaselines_every_record() {
        let (temp_dir, mut store) = setup(&["BADSIG", "EVIL"]);
        let infected = temp_dir.path().join("infected.txt");
        let clean = temp_dir.path().join("clean.txt");
        let pending = temp_dir.path().join("pending.txt");
        fs::write(&infected, "x EVIL y BADSIG z EVIL").unwrap();
        fs::write(&clean, "nothing here").unwrap();
        store.create_index().unwrap();
        store.scan_files_for_viruses().unwrap();

        // Edited after the scan and added without classification
        fs::write(&clean, "nothing here, edited").unwrap();
        fs::write(&pending, "never scanned").unwrap();
        store.update_index().unwrap();
        assert_eq!(store.get("clean.txt").unwrap().status(), FileStatus::NotScanned);
        assert_eq!(store.get("pending.txt").unwrap().status(), FileStatus::NotScanned);

        let report = store.fix_infected_files().unwrap();

        let content = fs::read_to_string(&infected).unwrap();
        assert_eq!(content, "x  y  z ");
        assert!(store.signatures().first_match(&content).is_none());

        // Only the infected file was rewritten, but all three are Safe again
        assert_eq!(report.repaired, 1);
        assert_eq!(report.rebaselined, 3);
        assert_eq!(fs::read_to_string(&clean).unwrap(), "nothing here, edited");
        for record in store.records() {
            assert_eq!(record.status(), FileStatus::Safe);
            let on_disk = fs::read(record.path()).unwrap();
            assert_eq!(record.fingerprint(), fingerprint_bytes(&on_disk));
        }

        let entry = report.entries.iter().find(|e| e.name == "infected.txt").unwrap();
        assert!(entry.rewritten);
        assert_eq!(entry.prior_status, FileStatus::Dangerous);
        assert_eq!(entry.occurrences_removed, 3);
    }

    #[test]
    fn test_fix_one_dangerous_one_safe() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        fs::write(temp_dir.path().join("bad.txt"), "BADSIG!").unwrap();
        fs::write(temp_dir.path().join("good.txt"), "fine").unwrap();
        store.create_index().unwrap();
        store.scan_files_for_viruses().unwrap();
        let good_fp = store.get("good.txt").unwrap().fingerprint().to_string();

        store.fix_infected_files().unwrap();

        assert_eq!(store.get("bad.txt").unwrap().status(), FileStatus::Safe);
        assert_eq!(store.get("good.txt").unwrap().status(), FileStatus::Safe);
        assert_eq!(fs::read_to_string(temp_dir.path().join("bad.txt")).unwrap(), "!");
        assert_eq!(store.get("bad.txt").unwrap().fingerprint(), fingerprint_bytes(b"!"));
        // Unchanged content keeps the same fingerprint
        assert_eq!(store.get("good.txt").unwrap().fingerprint(), good_fp);
    }

    #[test]
    fn test_fix_on_clean_index_rewrites_nothing() {
        let (temp_dir, mut store) = setup(&["BADSIG"]);
        fs::write(temp_dir.path().join("a.txt"), "fine").unwrap();
        store.create_index().unwrap();

        let report = store.fix_infected_files().unwrap();
        assert_eq!(report.repaired, 0);
        assert_eq!(report.bytes_removed, 0);
        assert_eq!(store.records()[0].status(), FileStatus::Safe);
    }
}
