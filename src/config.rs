//! # Configuration Module
//!
//! Runtime configuration for a catalog build and the platform data directory.
//!
//! ## Configuration File
//!
//! All settings are optional; a TOML file passed with `--config` overrides the
//! defaults field by field:
//!
//! ```toml
//! legacy_until = "2024-01-20"
//! current_from = "2024-01-27"
//! link_base = "https://www.youtube.com/watch"
//! merge_policy = "earliest"
//! ignored_files = ["disc.txt"]
//! ```
//!
//! ## Data Storage
//!
//! The default SQLite export lives in the platform-standard data directory:
//! - Linux: `~/.local/share/setlist/`
//! - macOS: `~/Library/Application Support/setlist/`
//! - Windows: `%APPDATA%\setlist\`

use anyhow::{anyhow, ensure, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How entry-level fields are picked when one song appears many times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The chronologically earliest occurrence defines every entry field.
    #[default]
    Earliest,
    /// Like `Earliest`, but `source` comes from the latest occurrence that
    /// has one.
    LatestSource,
}

/// Configuration for one catalog build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Last date (inclusive) written in the ` | ` separated grammar.
    pub legacy_until: NaiveDate,
    /// First date (inclusive) written in the numbered full-width grammar.
    pub current_from: NaiveDate,
    /// Watch URL prefix; links become `<link_base>?v=<id>&t=<secs>s`.
    pub link_base: String,
    pub exceptions_file: String,
    pub acapella_file: String,
    pub headers_file: String,
    /// Other non-timeline files living next to the timelines.
    pub ignored_files: Vec<String>,
    pub merge_policy: MergePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            legacy_until: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap_or_default(),
            current_from: NaiveDate::from_ymd_opt(2024, 1, 27).unwrap_or_default(),
            link_base: "https://www.youtube.com/watch".to_string(),
            exceptions_file: "exceptions.txt".to_string(),
            acapella_file: "acapella.txt".to_string(),
            headers_file: "headers.txt".to_string(),
            ignored_files: vec!["disc.txt".to_string()],
            merge_policy: MergePolicy::Earliest,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Invalid configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or fall back to the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read configuration {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.legacy_until < self.current_from,
            "legacy_until ({}) must be before current_from ({})",
            self.legacy_until,
            self.current_from
        );
        ensure!(!self.link_base.is_empty(), "link_base must not be empty");
        Ok(())
    }

    /// Whether `name` in the timeline directory is a rule or other known
    /// non-timeline file.
    pub fn is_ignored(&self, name: &str) -> bool {
        name == self.exceptions_file
            || name == self.acapella_file
            || name == self.headers_file
            || self.ignored_files.iter().any(|ignored| ignored == name)
    }
}

/// Returns the platform-appropriate data directory for setlist, creating it if
/// needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let setlist_dir = data_dir.join("setlist");
    fs::create_dir_all(&setlist_dir).with_context(|| {
        format!(
            "Failed to create setlist data directory at {}. Please check file permissions.",
            setlist_dir.display()
        )
    })?;

    Ok(setlist_dir)
}

/// Default location of the SQLite export.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("catalog.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cutovers() {
        let config = RuntimeConfig::default();
        assert_eq!(config.legacy_until, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(config.current_from, NaiveDate::from_ymd_opt(2024, 1, 27).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml(
            "current_from = \"2024-02-01\"\nmerge_policy = \"latest-source\"\n",
        )
        .unwrap();
        assert_eq!(config.current_from, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(config.legacy_until, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(config.merge_policy, MergePolicy::LatestSource);
        assert_eq!(config.exceptions_file, "exceptions.txt");
    }

    #[test]
    fn test_reversed_cutovers_rejected() {
        let result = RuntimeConfig::from_toml(
            "legacy_until = \"2024-03-01\"\ncurrent_from = \"2024-02-01\"\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ignored_files() {
        let config = RuntimeConfig::default();
        assert!(config.is_ignored("exceptions.txt"));
        assert!(config.is_ignored("headers.txt"));
        assert!(config.is_ignored("disc.txt"));
        assert!(!config.is_ignored("20240115.txt"));
    }

    #[test]
    fn test_load_without_path_is_default() {
        assert_eq!(RuntimeConfig::load(None).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_get_data_dir_is_named_setlist() {
        let dir = get_data_dir().expect("Should get data directory");
        assert_eq!(dir.file_name().unwrap(), "setlist");
        assert!(dir.is_dir());
    }
}
