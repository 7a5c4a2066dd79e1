//! Tracked file records

use crate::error::{EngineError, Result};
use crate::fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Classification state of a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    /// New, moved, or edited since the last classification
    #[serde(rename = "Not scanned")]
    NotScanned,
    /// Contains none of the signatures
    Safe,
    /// Contains at least one signature
    Dangerous,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::NotScanned => "Not scanned",
            FileStatus::Safe => "Safe",
            FileStatus::Dangerous => "Dangerous",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Not scanned" => Ok(FileStatus::NotScanned),
            "Safe" => Ok(FileStatus::Safe),
            "Dangerous" => Ok(FileStatus::Dangerous),
            other => Err(EngineError::InvalidStatus(other.to_string())),
        }
    }
}

/// One tracked file in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    name: String,
    path: PathBuf,
    status: FileStatus,
    fingerprint: String,
}

impl FileRecord {
    /// Start tracking a file that was just discovered
    ///
    /// Status starts as `NotScanned` and the fingerprint is taken from the
    /// file's content right away.
    pub fn discover(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let fingerprint = fingerprint::fingerprint_file(&path)?;
        let mut record = Self {
            name: name.into(),
            path,
            status: FileStatus::NotScanned,
            fingerprint: String::new(),
        };
        record.set_fingerprint(fingerprint)?;
        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn set_status(&mut self, status: FileStatus) {
        self.status = status;
    }

    /// Assign a status from its textual form
    ///
    /// Anything other than the three known labels is rejected and the current
    /// status is kept.
    pub fn set_status_str(&mut self, status: &str) -> Result<()> {
        self.status = status.parse()?;
        Ok(())
    }

    pub fn set_fingerprint(&mut self, fingerprint: impl Into<String>) -> Result<()> {
        let fingerprint = fingerprint.into();
        if fingerprint.is_empty() {
            return Err(EngineError::EmptyFingerprint);
        }
        self.fingerprint = fingerprint;
        Ok(())
    }

    /// Recompute the fingerprint from the file as it is on disk now
    pub fn refresh_fingerprint(&mut self) -> Result<()> {
        let fingerprint = fingerprint::fingerprint_file(&self.path)?;
        self.set_fingerprint(fingerprint)
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, status: {}, path: {}",
            self.name,
            self.status,
            self.path.display()
        )
    }
}
