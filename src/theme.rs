//! Terminal styling for human-readable output

use crate::record::FileStatus;
use colored::*;

pub struct Theme;

impl Theme {
    pub fn header(text: &str) -> ColoredString {
        text.bold()
    }

    pub fn primary(text: &str) -> ColoredString {
        text.normal()
    }

    pub fn muted(text: &str) -> ColoredString {
        text.dimmed()
    }

    pub fn value(text: &str) -> ColoredString {
        text.bold()
    }

    pub fn success(text: &str) -> ColoredString {
        text.green().bold()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red().bold()
    }

    pub fn divider(width: usize) -> ColoredString {
        "─".repeat(width).dimmed()
    }

    pub fn divider_bold(width: usize) -> ColoredString {
        "━".repeat(width).normal()
    }

    /// Status label: green when safe, red when dangerous, blue when pending
    pub fn status(status: FileStatus) -> ColoredString {
        match status {
            FileStatus::Safe => status.as_str().green(),
            FileStatus::Dangerous => status.as_str().red(),
            FileStatus::NotScanned => status.as_str().blue(),
        }
    }
}
