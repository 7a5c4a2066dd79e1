//! User configuration, stored as TOML in the platform config directory

use crate::index::IndexOptions;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanSettings,
    pub watch: WatchSettings,
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Tracked file extension, without the dot
    pub extension: String,
    /// Newline-delimited signature list; the built-in list when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures_file: Option<PathBuf>,
    pub follow_links: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Seconds between periodic rescans
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exclusions {
    /// Glob patterns matched against paths relative to the scanned root
    pub patterns: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            signatures_file: None,
            follow_links: false,
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Config {
    /// Location of the config file
    pub fn config_path() -> Result<PathBuf> {
        directories::ProjectDirs::from("", "", "sigguard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .context("Could not determine a config directory")
    }

    /// Load the user config, falling back to defaults
    ///
    /// A missing file is normal. An unreadable or malformed one is reported
    /// and ignored.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "using default configuration");
                return Self::default();
            }
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "ignoring config file");
                Self::default()
            }
        }
    }

    /// Load the user config, writing the defaults first if no file exists
    pub fn load_or_create() -> Self {
        if let Ok(path) = Self::config_path() {
            if !path.exists() {
                if let Err(e) = Self::default().save_to(&path) {
                    tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "could not write default config");
                }
            }
        }
        Self::load()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = self.to_toml()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Apply command-line values on top of the loaded file
    pub fn apply_cli_overrides(
        &mut self,
        extension: Option<String>,
        signatures_file: Option<PathBuf>,
        interval_secs: Option<u64>,
        exclude: &[String],
    ) {
        if let Some(ext) = extension {
            self.scan.extension = ext;
        }
        if let Some(path) = signatures_file {
            self.scan.signatures_file = Some(path);
        }
        if let Some(secs) = interval_secs {
            self.watch.interval_secs = secs;
        }
        self.exclusions.patterns.extend(exclude.iter().cloned());
    }

    /// Compile the exclusion patterns
    pub fn exclusion_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclusions.patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid exclusion pattern '{}'", pattern))?;
            builder.add(glob);
        }
        builder.build().context("Failed to compile exclusion patterns")
    }

    /// Index visibility settings derived from this config
    pub fn index_options(&self) -> Result<IndexOptions> {
        Ok(IndexOptions {
            extension: self.scan.extension.trim_start_matches('.').to_string(),
            follow_links: self.scan.follow_links,
            exclusions: self.exclusion_set()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scan.extension, "txt");
        assert!(config.scan.signatures_file.is_none());
        assert_eq!(config.watch.interval_secs, 60);
        assert!(config.exclusions.patterns.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[scan]\nextension = \"log\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scan.extension, "log");
        assert_eq!(config.watch.interval_secs, 60);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.scan.signatures_file = Some(PathBuf::from("/etc/sigguard/viruses.txt"));
        config.exclusions.patterns.push("vendor/**".to_string());
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[scan\nextension = ").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.exclusions.patterns.push("a/**".to_string());
        config.apply_cli_overrides(
            Some(".md".to_string()),
            Some(PathBuf::from("sigs.txt")),
            Some(5),
            &["b/**".to_string()],
        );

        assert_eq!(config.watch.interval_secs, 5);
        assert_eq!(config.scan.signatures_file, Some(PathBuf::from("sigs.txt")));
        assert_eq!(config.exclusions.patterns, vec!["a/**", "b/**"]);

        let options = config.index_options().unwrap();
        assert_eq!(options.extension, "md");

        // Absent overrides leave values alone
        config.apply_cli_overrides(None, None, None, &[]);
        assert_eq!(config.watch.interval_secs, 5);
    }

    #[test]
    fn test_exclusions() {
        let mut config = Config::default();
        config.exclusions.patterns = vec!["vendor/**".to_string(), "*.bak.txt".to_string()];

        let set = config.exclusion_set().unwrap();
        assert!(set.is_match(Path::new("vendor/lib/a.txt")));
        assert!(set.is_match(Path::new("old.bak.txt")));
        assert!(!set.is_match(Path::new("src/a.txt")));
    }

    #[test]
    fn test_invalid_exclusion_pattern() {
        let mut config = Config::default();
        config.exclusions.patterns.push("a[".to_string());
        assert!(config.index_options().is_err());
    }
}
