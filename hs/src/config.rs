//! Configuration for historystore
//!
//! `hs` reads the daemon's own config file so both always agree on where
//! history lives. Only the `history` section matters here; every other
//! section is ignored.

use eyre::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the history store directory (`history.path`)
    pub store_path: PathBuf,

    /// Default number of entries shown by `list` (`history.list-limit`)
    pub list_limit: usize,
}

/// Shape of the daemon config file, reduced to what `hs` reads
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    history: HistorySection,
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct HistorySection {
    path: PathBuf,
    list_limit: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stormwatch")
        .join("history")
}

fn default_list_limit() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        HistorySection::default().into()
    }
}

impl From<HistorySection> for Config {
    fn from(history: HistorySection) -> Self {
        Self {
            store_path: history.path,
            list_limit: history.list_limit,
        }
    }
}

impl Config {
    /// Config files tried when no explicit path is given, in order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".stormwatch.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stormwatch").join("stormwatch.yml"));
        }
        paths
    }

    /// Load config with the daemon's fallback chain
    ///
    /// Explicit path, then `./.stormwatch.yml`, then
    /// `~/.config/stormwatch/stormwatch.yml`, then defaults.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }
        Self::load_first(&Self::candidate_paths())
    }

    /// Load the first candidate that exists and parses
    ///
    /// A file that exists but fails to parse is logged and skipped, as the
    /// daemon does.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Failed to load config from {}: {:#}", path.display(), e),
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::debug!("Loaded config from: {}", path.display());
        Ok(file.history.into())
    }
}
