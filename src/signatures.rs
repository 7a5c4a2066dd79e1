//! Signature set loading and matching

use crate::error::{EngineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Signatures shipped with the binary, used when no source file is configured
const BUILTIN_SIGNATURES: &str = include_str!("../resources/signatures.txt");

/// Label reported as the source of the built-in list
pub const BUILTIN_SOURCE: &str = "<built-in>";

/// Ordered set of literal signature strings
///
/// Blank lines are skipped and repeated entries keep their first position, so
/// every entry is distinct and non-empty. Never empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    source: PathBuf,
    signatures: Vec<String>,
}

impl SignatureSet {
    /// Load a newline-delimited signature file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_lines(path, content.lines())
    }

    /// The list bundled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_lines(BUILTIN_SOURCE, BUILTIN_SIGNATURES.lines())
    }

    /// Build a set from already-split lines
    ///
    /// `source` only labels the set in errors and logs.
    pub fn from_lines<I, S>(source: impl Into<PathBuf>, lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source = source.into();
        let mut signatures: Vec<String> = Vec::new();

        for line in lines {
            let line = line.as_ref();
            if line.is_empty() || signatures.iter().any(|s| s == line) {
                continue;
            }
            signatures.push(line.to_string());
        }

        if signatures.is_empty() {
            return Err(EngineError::EmptySignatureSet(source));
        }

        tracing::debug!(source = %source.display(), count = signatures.len(), "signature set loaded");
        Ok(Self { source, signatures })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(String::as_str)
    }

    /// First signature, in set order, contained in `content`
    ///
    /// Plain case-sensitive substring containment.
    pub fn first_match(&self, content: &str) -> Option<&str> {
        self.iter().find(|sig| content.contains(sig))
    }

    /// Remove every occurrence of every signature from `content`
    ///
    /// Signatures are applied one after another in set order, single pass.
    /// Returns the cleaned text and the number of occurrences removed.
    pub fn strip(&self, content: &str) -> (String, usize) {
        let mut cleaned = content.to_string();
        let mut removed = 0;

        for sig in self.iter() {
            let hits = cleaned.matches(sig).count();
            if hits > 0 {
                removed += hits;
                cleaned = cleaned.replace(sig, "");
            }
        }

        (cleaned, removed)
    }
}
