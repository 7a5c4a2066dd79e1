//! Sigguard library crate
//!
//! Indexes the text files under a directory, classifies them against a set of
//! signature strings, and strips those signatures from infected files. The
//! `sigguard` binary is a thin driver over this API.

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod index;
pub mod output;
pub mod progress;
pub mod record;
pub mod remediate;
pub mod scanner;
pub mod signatures;
pub mod theme;

pub use error::{EngineError, Result};
pub use index::{IndexOptions, IndexStore, SyncReport};
pub use record::{FileRecord, FileStatus};
pub use remediate::FixReport;
pub use scanner::ScanReport;
pub use signatures::SignatureSet;
