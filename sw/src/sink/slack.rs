//! Chat webhook sink (Slack incoming webhooks)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{NotificationSink, SinkError, headline};
use crate::config::Config;
use crate::progress::ProgressDelta;

const ATTACHMENT_COLOR: &str = "#007500";

#[derive(Debug, Serialize)]
struct SlackPost {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    text: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: String,
    fields: Vec<SlackField>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    value: String,
    short: bool,
}

/// Posts progress updates to a chat webhook
pub struct SlackSink {
    webhook_url: String,
    channel: Option<String>,
    author: String,
    http: Client,
}

impl SlackSink {
    pub fn new(
        webhook_url: impl Into<String>,
        channel: Option<String>,
        author: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        debug!(?channel, ?timeout, "SlackSink::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            channel,
            author: author.into(),
            http,
        })
    }

    /// Build from config, reading the webhook URL from the environment
    pub fn from_config(config: &Config) -> Result<Self, SinkError> {
        let webhook_url = config.slack.webhook_url().ok_or_else(|| {
            SinkError::NotConfigured(format!("{} is not set", config.slack.webhook_url_env))
        })?;
        Self::new(
            webhook_url,
            config.slack.channel.clone(),
            config.source.author.clone(),
            Duration::from_millis(config.monitor.dispatch_timeout_ms),
        )
    }

    fn build_post(&self, deltas: &[ProgressDelta]) -> SlackPost {
        SlackPost {
            channel: self.channel.clone(),
            text: format!("*{}:*", headline(&self.author)),
            attachments: vec![SlackAttachment {
                color: ATTACHMENT_COLOR.to_string(),
                fields: deltas
                    .iter()
                    .map(|delta| SlackField {
                        value: delta.to_string(),
                        short: false,
                    })
                    .collect(),
            }],
        }
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    fn name(&self) -> &str {
        "slack"
    }

    async fn dispatch(&self, deltas: &[ProgressDelta]) -> Result<(), SinkError> {
        debug!(count = deltas.len(), "SlackSink::dispatch: called");
        if self.webhook_url.trim().is_empty() {
            return Err(SinkError::NotConfigured("webhook URL is empty".to_string()));
        }
        if deltas.is_empty() {
            return Err(SinkError::NoUpdates);
        }

        let post = self.build_post(deltas);
        let response = self.http.post(&self.webhook_url).json(&post).send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        // Webhooks answer with a literal "ok" on success
        if body.trim() != "ok" {
            debug!(status, %body, "SlackSink::dispatch: non-ok response");
            return Err(SinkError::Rejected { status, body });
        }

        Ok(())
    }
}
