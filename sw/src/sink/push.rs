//! Mobile push sink (Firebase Cloud Messaging HTTP v1)

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{NotificationSink, SinkError, headline};
use crate::config::{Config, PushConfig};
use crate::progress::ProgressDelta;

/// Messages older than this are dropped by the push service
const MESSAGE_TTL: &str = "3600s";

/// Newer updates replace undelivered older ones on the device
const COLLAPSE_KEY: &str = "progress_update";

const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Where the OAuth bearer token comes from
///
/// Access tokens expire after about an hour, so `Env` and `File` are read
/// again on every dispatch. Whatever refreshes the token only has to update
/// the variable or rewrite the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    Fixed(String),
    Env(String),
    File(PathBuf),
}

impl AccessToken {
    /// Pick the token source named by the push config; a file wins over the env var
    pub fn from_config(config: &PushConfig) -> Self {
        match &config.access_token_file {
            Some(path) => AccessToken::File(path.clone()),
            None => AccessToken::Env(config.access_token_env.clone()),
        }
    }

    /// Current token value
    pub fn resolve(&self) -> Result<String, SinkError> {
        let token = match self {
            AccessToken::Fixed(token) => token.clone(),
            AccessToken::Env(var) => std::env::var(var)
                .map_err(|_| SinkError::NotConfigured(format!("{} is not set", var)))?,
            AccessToken::File(path) => fs::read_to_string(path).map_err(|e| {
                SinkError::NotConfigured(format!("cannot read access token from {}: {}", path.display(), e))
            })?,
        };
        let token = token.trim();
        if token.is_empty() {
            return Err(SinkError::NotConfigured("push access token is empty".to_string()));
        }
        Ok(token.to_string())
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        AccessToken::Fixed(token.to_string())
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        AccessToken::Fixed(token)
    }
}

/// Sends a topic message to subscribed devices
pub struct PushSink {
    endpoint: String,
    topic: String,
    access_token: AccessToken,
    title: String,
    body: String,
    http: Client,
}

impl PushSink {
    pub fn new(
        base_url: &str,
        project_id: &str,
        topic: impl Into<String>,
        access_token: impl Into<AccessToken>,
        title: impl Into<String>,
        author: &str,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let endpoint = format!(
            "{}/v1/projects/{}/messages:send",
            base_url.trim_end_matches('/'),
            project_id
        );
        debug!(%endpoint, ?timeout, "PushSink::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            topic: topic.into(),
            access_token: access_token.into(),
            title: title.into(),
            body: headline(author),
            http,
        })
    }

    /// Build from config
    ///
    /// The token must resolve now so a missing credential fails at startup,
    /// but it is looked up again for every message.
    pub fn from_config(config: &Config) -> Result<Self, SinkError> {
        let push = &config.push;
        if push.project_id.trim().is_empty() {
            return Err(SinkError::NotConfigured("push.project-id is empty".to_string()));
        }
        let token = AccessToken::from_config(push);
        token.resolve()?;
        Self::new(
            &push.base_url,
            &push.project_id,
            push.topic.clone(),
            token,
            push.title.clone(),
            &config.source.author,
            Duration::from_millis(config.monitor.dispatch_timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bearer token the next message will carry
    pub fn access_token(&self) -> Result<String, SinkError> {
        self.access_token.resolve()
    }

    fn build_message(&self, deltas: &[ProgressDelta]) -> Result<Value, SinkError> {
        // Data values must be strings, so the deltas travel as embedded JSON
        let works = serde_json::to_string(deltas)?;
        Ok(json!({
            "message": {
                "topic": self.topic,
                "data": {
                    "worksInProgress": works,
                },
                "android": {
                    "ttl": MESSAGE_TTL,
                    "priority": "normal",
                    "collapse_key": COLLAPSE_KEY,
                    "notification": {
                        "title": self.title,
                        "body": self.body,
                        "click_action": CLICK_ACTION,
                    },
                },
            }
        }))
    }
}

#[async_trait]
impl NotificationSink for PushSink {
    fn name(&self) -> &str {
        "push"
    }

    async fn dispatch(&self, deltas: &[ProgressDelta]) -> Result<(), SinkError> {
        debug!(count = deltas.len(), topic = %self.topic, "PushSink::dispatch: called");
        if deltas.is_empty() {
            return Err(SinkError::NoUpdates);
        }

        let token = self.access_token()?;
        let message = self.build_message(deltas)?;
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&token)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(topic = %self.topic, "Push message accepted");
        Ok(())
    }
}
