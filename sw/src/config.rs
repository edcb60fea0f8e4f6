//! Stormwatch configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Stormwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Where progress is read from
    pub source: SourceConfig,

    /// Polling and dispatch timing
    pub monitor: MonitorSettings,

    /// History storage
    pub history: HistoryConfig,

    /// Chat webhook sink
    pub slack: SlackConfig,

    /// Mobile push sink
    pub push: PushConfig,

    /// Status page sink
    #[serde(rename = "status-page")]
    pub status_page: StatusPageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that every enabled sink has the environment variables and
    /// fields it needs. Call this early in startup to fail fast.
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(eyre::eyre!("source.url must not be empty"));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(eyre::eyre!("monitor.poll-interval-secs must be greater than zero"));
        }

        if self.slack.enabled && std::env::var(&self.slack.webhook_url_env).is_err() {
            return Err(eyre::eyre!(
                "Slack webhook URL not found. Set the {} environment variable.",
                self.slack.webhook_url_env
            ));
        }

        if self.push.enabled {
            if self.push.project_id.trim().is_empty() {
                return Err(eyre::eyre!("push.project-id is required when push is enabled"));
            }
            if self.push.access_token().is_none() {
                return Err(match &self.push.access_token_file {
                    Some(path) => eyre::eyre!("Push access token file is missing or empty: {}", path.display()),
                    None => eyre::eyre!(
                        "Push access token not found. Set the {} environment variable.",
                        self.push.access_token_env
                    ),
                });
            }
        }

        if self.status_page.enabled && self.status_page.publish.enabled && !self.status_page.publish.repo_dir.exists()
        {
            return Err(eyre::eyre!(
                "Status page repo directory does not exist: {}",
                self.status_page.publish.repo_dir.display()
            ));
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .stormwatch.yml
        let local_config = PathBuf::from(".stormwatch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/stormwatch/stormwatch.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("stormwatch").join("stormwatch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, ignoring any other problems with the file
    ///
    /// Used before logging is initialized.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Source page configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Page listing works in progress
    pub url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Author name used in notification text
    pub author: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://www.brandonsanderson.com".to_string(),
            timeout_ms: 10_000,
            author: "Brandon Sanderson".to_string(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Monitor timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between polls
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Per-sink dispatch timeout in milliseconds
    #[serde(rename = "dispatch-timeout-ms")]
    pub dispatch_timeout_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            dispatch_timeout_ms: 10_000,
        }
    }
}

/// History storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory for the history store
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/stormwatch on Linux)
        let path = dirs::data_dir()
            .map(|d| d.join("stormwatch"))
            .unwrap_or_else(|| PathBuf::from(".stormwatch"))
            .join("history");
        Self { path }
    }
}

/// Chat webhook sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,

    /// Environment variable containing the webhook URL
    #[serde(rename = "webhook-url-env")]
    pub webhook_url_env: String,

    /// Post to this channel instead of the webhook's default
    pub channel: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url_env: "SLACK_WEBHOOK_URL".to_string(),
            channel: None,
        }
    }
}

impl SlackConfig {
    /// Read the webhook URL from the configured environment variable
    pub fn webhook_url(&self) -> Option<String> {
        std::env::var(&self.webhook_url_env).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Mobile push sink (FCM HTTP v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub enabled: bool,

    /// Firebase project ID
    #[serde(rename = "project-id")]
    pub project_id: String,

    /// Topic subscribers listen on
    pub topic: String,

    /// Environment variable containing an OAuth access token
    #[serde(rename = "access-token-env")]
    pub access_token_env: String,

    /// File holding the access token; takes precedence over the env var
    ///
    /// Read on every message, so an external refresher can rewrite it.
    #[serde(rename = "access-token-file")]
    pub access_token_file: Option<PathBuf>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Notification title shown on devices
    pub title: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            topic: "progress".to_string(),
            access_token_env: "FCM_ACCESS_TOKEN".to_string(),
            access_token_file: None,
            base_url: "https://fcm.googleapis.com".to_string(),
            title: "Stormwatch".to_string(),
        }
    }
}

impl PushConfig {
    /// Current access token from the configured file or environment variable
    pub fn access_token(&self) -> Option<String> {
        let token = match &self.access_token_file {
            Some(path) => fs::read_to_string(path).ok()?,
            None => std::env::var(&self.access_token_env).ok()?,
        };
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

/// Status page sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageConfig {
    pub enabled: bool,

    /// Directory the rendered index.html is written to
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Git publishing of the rendered page
    pub publish: PublishConfig,
}

impl Default for StatusPageConfig {
    fn default() -> Self {
        let output_dir = dirs::data_dir()
            .map(|d| d.join("stormwatch"))
            .unwrap_or_else(|| PathBuf::from(".stormwatch"))
            .join("status-page");
        Self {
            enabled: false,
            output_dir,
            publish: PublishConfig::default(),
        }
    }
}

/// Git publishing settings for the status page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,

    /// Local checkout of the hosting repository
    #[serde(rename = "repo-dir")]
    pub repo_dir: PathBuf,

    pub remote: String,

    pub branch: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_dir: PathBuf::from("."),
            remote: "origin".to_string(),
            branch: "gh-pages".to_string(),
        }
    }
}
