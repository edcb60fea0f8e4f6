//! Scrapes works in progress from the author's website

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{ProgressSource, SourceError};
use crate::config::SourceConfig;
use crate::progress::{ProgressItem, Snapshot};

/// Paragraphs inside each progress widget: percentage first, then title
const ENTRY_SELECTOR: &str = ".progress-item-uniq p";

/// Reads progress by fetching and parsing an HTML page
pub struct WebProgressSource {
    url: String,
    http: Client,
    timeout: Duration,
}

impl WebProgressSource {
    /// Create a source for `url` with a request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let url = url.into();
        debug!(%url, ?timeout, "WebProgressSource::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http, timeout })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        Self::new(config.url.clone(), config.timeout())
    }

    async fn fetch(&self) -> Result<String, SourceError> {
        debug!(url = %self.url, "fetch: called");
        let response = self.http.get(&self.url).send().await.map_err(|e| self.map_http(e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "fetch: non-success status");
            return Err(SourceError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.map_http(e))
    }

    fn map_http(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Http(e)
        }
    }
}

#[async_trait]
impl ProgressSource for WebProgressSource {
    async fn read(&self) -> Result<Snapshot, SourceError> {
        let body = self.fetch().await?;
        let snapshot = parse_progress_html(&body)?;
        debug!(items = snapshot.len(), "read: parsed snapshot");
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Parse works in progress out of the page markup
///
/// Entries come in pairs of paragraphs: `"81%"` followed by the title.
/// A trailing unpaired paragraph is ignored.
pub fn parse_progress_html(html: &str) -> Result<Snapshot, SourceError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(ENTRY_SELECTOR).map_err(|e| SourceError::Parse(e.to_string()))?;

    let texts: Vec<String> = document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect();

    let mut items = Vec::with_capacity(texts.len() / 2);
    for (idx, pair) in texts.chunks_exact(2).enumerate() {
        let percent_str = pair[0].trim().trim_end_matches('%').trim();
        if percent_str.is_empty() {
            return Err(SourceError::Parse(format!("empty percentage in entry {}", idx)));
        }
        let progress: u8 = percent_str
            .parse()
            .map_err(|e| SourceError::Parse(format!("entry {} percentage {:?}: {}", idx, percent_str, e)))?;
        if progress > 100 {
            return Err(SourceError::Parse(format!("entry {} percentage {} exceeds 100", idx, progress)));
        }

        let title = pair[1].trim();
        if title.is_empty() {
            return Err(SourceError::Parse(format!("empty title in entry {}", idx)));
        }

        items.push(ProgressItem::new(title, progress));
    }

    if items.is_empty() {
        warn!(html_len = html.len(), "No progress entries found in page");
        return Err(SourceError::NoEntries);
    }

    Ok(Snapshot::new(items))
}
