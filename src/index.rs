//! In-memory index of tracked files and its synchronization with the disk
//!
//! Records are keyed by base file name. A full build (`create_index`) only adds
//! names it has not seen; an incremental pass (`update_index`) reconciles the
//! index against a fresh listing in explicit phases:
//!
//! 1. drop records whose name no longer exists anywhere under the root
//! 2. drop records whose name exists only at other paths (treated as moved)
//! 3. add records for names that are not indexed
//! 4. reset the status of surviving records whose content fingerprint changed

use crate::error::{EngineError, Result};
use crate::fingerprint;
use crate::record::{FileRecord, FileStatus};
use crate::remediate::{self, FixReport};
use crate::scanner::{self, ScanReport};
use crate::signatures::SignatureSet;
use globset::GlobSet;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Which files under the root are visible to the index
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Tracked extension, without the leading dot
    pub extension: String,
    pub follow_links: bool,
    /// Paths (relative to the root) matching any of these are ignored
    pub exclusions: GlobSet,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            follow_links: false,
            exclusions: GlobSet::empty(),
        }
    }
}

impl IndexOptions {
    pub fn with_extension(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            ..Self::default()
        }
    }
}

/// A file found by walking the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub path: PathBuf,
}

/// What one synchronization pass changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub removed: Vec<PathBuf>,
    pub moved: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.moved.is_empty()
            && self.added.is_empty()
            && self.changed.is_empty()
    }
}

/// Ordered set of tracked files under one root directory
#[derive(Debug)]
pub struct IndexStore {
    root: PathBuf,
    signatures: SignatureSet,
    options: IndexOptions,
    records: Vec<FileRecord>,
}

impl IndexStore {
    /// Create an empty index over `root` tracking `*.txt` files
    pub fn new(root: impl Into<PathBuf>, signatures: SignatureSet) -> Result<Self> {
        Self::with_options(root, signatures, IndexOptions::default())
    }

    pub fn with_options(
        root: impl Into<PathBuf>,
        signatures: SignatureSet,
        options: IndexOptions,
    ) -> Result<Self> {
        let root = absolute(root.into())?;
        if !root.is_dir() {
            return Err(EngineError::DirectoryNotFound(root));
        }

        Ok(Self {
            root,
            signatures,
            options,
            records: Vec::new(),
        })
    }

    /// Validate `root`, then load the signature source
    ///
    /// `None` selects the built-in signature list. Nothing is constructed if
    /// either step fails.
    pub fn open(
        root: impl Into<PathBuf>,
        signatures_file: Option<&Path>,
        options: IndexOptions,
    ) -> Result<Self> {
        let root = absolute(root.into())?;
        if !root.is_dir() {
            return Err(EngineError::DirectoryNotFound(root));
        }

        let signatures = match signatures_file {
            Some(path) => SignatureSet::load(path)?,
            None => SignatureSet::builtin()?,
        };

        Self::with_options(root, signatures, options)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Records in name order
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records currently in `status`
    pub fn count_status(&self, status: FileStatus) -> usize {
        self.records.iter().filter(|r| r.status() == status).count()
    }

    pub(crate) fn parts_mut(&mut self) -> (&SignatureSet, &mut [FileRecord]) {
        (&self.signatures, &mut self.records)
    }

    /// Walk the root and list every tracked file
    ///
    /// Entries come back in a stable order (sorted by file name per directory).
    pub fn list_files(&self) -> Result<Vec<ListedFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(self.options.follow_links)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.is_tracked(path) {
                continue;
            }

            files.push(ListedFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_path_buf(),
            });
        }

        Ok(files)
    }

    /// A bare `.txt` counts: only the name's ending is checked
    fn is_tracked(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.options.extension);
        let matches_ext = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(&suffix))
            .unwrap_or(false);
        if !matches_ext {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.options.exclusions.is_match(relative)
    }

    /// Insert keeping the records sorted by name
    fn insert(&mut self, record: FileRecord) {
        let pos = self
            .records
            .partition_point(|r| r.name() <= record.name());
        self.records.insert(pos, record);
    }

    /// Index every tracked file whose name is not indexed yet
    ///
    /// Records that already exist are left as they are, stale or not.
    /// Returns the number of records added.
    pub fn create_index(&mut self) -> Result<usize> {
        let listing = self.list_files()?;
        let mut known: HashSet<String> =
            self.records.iter().map(|r| r.name().to_string()).collect();
        let mut added = 0;

        for file in listing {
            if known.contains(&file.name) {
                continue;
            }
            let record = FileRecord::discover(file.name.clone(), file.path)?;
            debug!(name = %record.name(), path = %record.path().display(), "indexed");
            known.insert(file.name);
            self.insert(record);
            added += 1;
        }

        info!(root = %self.root.display(), added, total = self.records.len(), "index created");
        Ok(added)
    }

    /// Reconcile the index with the current state of the directory tree
    pub fn update_index(&mut self) -> Result<SyncReport> {
        let listing = self.list_files()?;
        let mut report = SyncReport::default();

        let mut listed: HashMap<&str, Vec<&Path>> = HashMap::new();
        for file in &listing {
            listed
                .entry(file.name.as_str())
                .or_default()
                .push(file.path.as_path());
        }

        // Removals first: vanished names, then names only found elsewhere
        for record in &self.records {
            match listed.get(record.name()) {
                None => report.removed.push(record.path().to_path_buf()),
                Some(paths) if !paths.contains(&record.path()) => {
                    report.moved.push(record.path().to_path_buf())
                }
                Some(_) => {}
            }
        }
        self.records.retain(|record| {
            listed
                .get(record.name())
                .map(|paths| paths.contains(&record.path()))
                .unwrap_or(false)
        });

        let surviving: HashSet<String> =
            self.records.iter().map(|r| r.name().to_string()).collect();

        let mut known = surviving.clone();
        for file in &listing {
            if known.contains(&file.name) {
                continue;
            }
            let record = FileRecord::discover(file.name.clone(), file.path.clone())?;
            known.insert(file.name.clone());
            report.added.push(file.path.clone());
            self.insert(record);
        }

        for file in &listing {
            if surviving.contains(&file.name) && self.check_hash(&file.path)? {
                report.changed.push(file.path.clone());
            }
        }

        info!(
            root = %self.root.display(),
            removed = report.removed.len(),
            moved = report.moved.len(),
            added = report.added.len(),
            changed = report.changed.len(),
            "index updated"
        );
        Ok(report)
    }

    /// Compare a file's current fingerprint with its record
    ///
    /// `file` may be relative to the root. The record is located by path, not
    /// name. On mismatch the record goes back to `NotScanned` and keeps its old
    /// fingerprint. Returns whether the status was reset.
    pub fn check_hash(&mut self, file: &Path) -> Result<bool> {
        let path = self.root.join(file);
        let Some(record) = self.records.iter_mut().find(|r| r.path() == path) else {
            return Ok(false);
        };

        let current = fingerprint::fingerprint_file(&path)?;
        if current == record.fingerprint() {
            return Ok(false);
        }

        debug!(path = %path.display(), "content changed since last fingerprint");
        record.set_status(FileStatus::NotScanned);
        Ok(true)
    }

    /// Classify every `NotScanned` record
    pub fn scan_files_for_viruses(&mut self) -> Result<ScanReport> {
        scanner::scan_files_for_viruses(self)
    }

    /// Strip signatures from infected files and re-baseline every record
    pub fn fix_infected_files(&mut self) -> Result<FixReport> {
        remediate::fix_infected_files(self)
    }
}

/// Resolve a relative root against the working directory, without touching
/// symlinks
fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|e| EngineError::io(&path, e))?;
    Ok(cwd.join(path))
}
