//! Status page sink - renders a static page and optionally publishes it with git

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use super::{NotificationSink, SinkError};
use crate::config::{Config, PublishConfig};
use crate::progress::ProgressDelta;

const TEMPLATE: &str = include_str!("status-page.html.hbs");

/// File name of the rendered page
pub const STATUS_PAGE_FILENAME: &str = "index.html";

#[derive(Debug, Serialize)]
struct PageContext<'a> {
    author: &'a str,
    updated_at: String,
    works: Vec<WorkView<'a>>,
}

#[derive(Debug, Serialize)]
struct WorkView<'a> {
    title: &'a str,
    progress: u8,
    prev_progress: u8,
    moved: bool,
}

/// Render the status page HTML for a delta list
pub fn render_status_page(
    author: &str,
    deltas: &[ProgressDelta],
    updated_at: DateTime<Utc>,
) -> Result<String, SinkError> {
    debug!(count = deltas.len(), "render_status_page: called");
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .register_template_string("status", TEMPLATE)
        .map_err(|e| SinkError::Render(e.to_string()))?;

    let context = PageContext {
        author,
        updated_at: updated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        works: deltas
            .iter()
            .map(|d| WorkView {
                title: &d.title,
                progress: d.progress,
                prev_progress: d.prev_progress,
                moved: d.has_moved(),
            })
            .collect(),
    };

    handlebars
        .render("status", &context)
        .map_err(|e| SinkError::Render(e.to_string()))
}

/// Writes the rendered page to disk and pushes it to the hosting repository
pub struct StatusPageSink {
    author: String,
    output_dir: PathBuf,
    publish: Option<PublishConfig>,
}

impl StatusPageSink {
    pub fn new(author: impl Into<String>, output_dir: impl Into<PathBuf>, publish: Option<PublishConfig>) -> Self {
        Self {
            author: author.into(),
            output_dir: output_dir.into(),
            publish,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let publish = config
            .status_page
            .publish
            .enabled
            .then(|| config.status_page.publish.clone());
        Self::new(
            config.source.author.clone(),
            config.status_page.output_dir.clone(),
            publish,
        )
    }

    /// Path of the rendered page
    pub fn page_path(&self) -> PathBuf {
        self.output_dir.join(STATUS_PAGE_FILENAME)
    }

    async fn publish(&self, publish: &PublishConfig, page: &str) -> Result<(), SinkError> {
        debug!(repo = %publish.repo_dir.display(), branch = %publish.branch, "publish: called");
        tokio::fs::write(publish.repo_dir.join(STATUS_PAGE_FILENAME), page).await?;

        run_git(&publish.repo_dir, &["add", STATUS_PAGE_FILENAME]).await?;

        let message = format!("Update {}", STATUS_PAGE_FILENAME);
        match run_git(&publish.repo_dir, &["commit", "-m", &message]).await {
            Ok(_) => {}
            Err(SinkError::Publish(out)) if out.contains("nothing to commit") => {
                debug!("publish: page unchanged, nothing to commit");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        run_git(&publish.repo_dir, &["push", &publish.remote, &publish.branch]).await?;
        info!(remote = %publish.remote, branch = %publish.branch, "Published status page");
        Ok(())
    }
}

/// Run a git command in `dir`, returning stdout
async fn run_git(dir: &Path, args: &[&str]) -> Result<String, SinkError> {
    debug!(?args, dir = %dir.display(), "run_git: called");
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SinkError::Publish(format!(
            "git {} failed: {}{}",
            args.first().unwrap_or(&""),
            stdout,
            stderr
        )));
    }
    Ok(stdout)
}

#[async_trait]
impl NotificationSink for StatusPageSink {
    fn name(&self) -> &str {
        "status-page"
    }

    async fn dispatch(&self, deltas: &[ProgressDelta]) -> Result<(), SinkError> {
        debug!(count = deltas.len(), "StatusPageSink::dispatch: called");
        let page = render_status_page(&self.author, deltas, Utc::now())?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.page_path(), &page).await?;
        info!(path = %self.page_path().display(), "Wrote status page");

        if let Some(publish) = &self.publish {
            self.publish(publish, &page).await?;
        }
        Ok(())
    }
}
