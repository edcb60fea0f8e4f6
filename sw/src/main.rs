//! Stormwatch - work-in-progress monitor
//!
//! CLI entry point for running the monitor and exercising its sinks.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use stormwatch::cli::{Cli, Command, SinkKind, get_log_path};
use stormwatch::config::Config;
use stormwatch::history::{Baseline, FileHistory, ProgressHistory};
use stormwatch::monitor::{Monitor, MonitorConfig};
use stormwatch::progress::{ProgressDelta, Snapshot};
use stormwatch::sink::{NotificationSink, PushSink, SlackSink, StatusPageSink, build_sinks, render_status_page};
use stormwatch::source::{ProgressSource, WebProgressSource};
use stormwatch::{compute_deltas, has_changed};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .context("Failed to open log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.log_stderr)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(source = %config.source.url, "Stormwatch loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run => {
            debug!("main: matched Run command");
            cmd_run(&config).await
        }
        Command::Check { json } => {
            debug!(json, "main: matched Check command");
            cmd_check(&config, json).await
        }
        Command::SendTest { sink } => {
            debug!(?sink, "main: matched SendTest command");
            cmd_send_test(&config, sink).await
        }
        Command::StatusPage { out } => {
            debug!(?out, "main: matched StatusPage command");
            cmd_status_page(&config, out)
        }
    }
}

async fn cmd_run(config: &Config) -> Result<()> {
    debug!("cmd_run: called");
    config.validate().context("Invalid configuration")?;

    let sinks = build_sinks(config).context("Failed to build notification sinks")?;
    let source = WebProgressSource::from_config(&config.source).context("Failed to create progress source")?;
    let history = FileHistory::open(&config.history.path)
        .with_context(|| format!("Failed to open history at {}", config.history.path.display()))?;

    let mut monitor = Monitor::new(
        Arc::new(source),
        Arc::new(history),
        sinks,
        MonitorConfig::from_config(config),
    );
    monitor.load_baseline().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    println!("Stormwatch running. Press Ctrl+C to stop.");
    println!("Logs: {}", get_log_path().display());

    debug!("cmd_run: setting up signal handlers");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                debug!("cmd_run: SIGINT received, initiating shutdown");
                warn!("SIGINT received");
            }
            _ = sigterm.recv() => {
                debug!("cmd_run: SIGTERM received, initiating shutdown");
                warn!("SIGTERM received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        debug!("cmd_run: waiting for ctrl_c (non-Unix)");
        tokio::signal::ctrl_c().await?;
    }

    let _ = shutdown_tx.send(()).await;
    info!("Stormwatch shutting down...");

    monitor_handle.await.context("Monitor task panicked")??;
    debug!("cmd_run: monitor finished");
    Ok(())
}

async fn cmd_check(config: &Config, as_json: bool) -> Result<()> {
    debug!(as_json, "cmd_check: called");
    let source = WebProgressSource::from_config(&config.source).context("Failed to create progress source")?;
    let current = source
        .read()
        .await
        .with_context(|| format!("Failed to read progress from {}", source.describe()))?;

    let history = FileHistory::open(&config.history.path)
        .with_context(|| format!("Failed to open history at {}", config.history.path.display()))?;
    let baseline = history.read_last().await?;
    let previous = match &baseline {
        Baseline::Empty => None,
        Baseline::Known(snapshot) => Some(snapshot),
    };

    let changed = previous.is_some_and(|prev| has_changed(&current, prev));
    let deltas = compute_deltas(&current, previous.unwrap_or(&Snapshot::empty()));

    if as_json {
        let report = json!({
            "source": source.describe(),
            "snapshot": current,
            "baseline": previous,
            "changed": changed,
            "deltas": deltas,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "Source:".bold(), source.describe());
    for delta in &deltas {
        if delta.has_moved() {
            println!("  {}", delta.to_string().green());
        } else {
            println!("  {}", delta);
        }
    }

    match previous {
        None => println!("{}", "No baseline recorded yet; the next run will record this snapshot.".yellow()),
        Some(_) if changed => println!("{}", "Changed since the last recorded snapshot.".green().bold()),
        Some(_) => println!("Unchanged since the last recorded snapshot."),
    }
    Ok(())
}

fn sample_deltas() -> Vec<ProgressDelta> {
    vec![
        ProgressDelta::new("Test Work", 50, 25),
        ProgressDelta::new("Another Test Work", 10, 0),
    ]
}

async fn cmd_send_test(config: &Config, kind: SinkKind) -> Result<()> {
    debug!(?kind, "cmd_send_test: called");
    let sink: Arc<dyn NotificationSink> = match kind {
        SinkKind::Slack => Arc::new(SlackSink::from_config(config)?),
        SinkKind::Push => Arc::new(PushSink::from_config(config)?),
        SinkKind::StatusPage => Arc::new(StatusPageSink::from_config(config)),
    };

    let timeout = std::time::Duration::from_millis(config.monitor.dispatch_timeout_ms);
    match tokio::time::timeout(timeout, sink.dispatch(&sample_deltas())).await {
        Ok(Ok(())) => {
            println!("{} sent test update via {}", "✓".green(), kind.sink_name());
            Ok(())
        }
        Ok(Err(e)) => Err::<(), _>(e).with_context(|| format!("Failed to send test update via {}", kind.sink_name())),
        Err(_) => Err(eyre::eyre!("{} timed out after {:?}", kind.sink_name(), timeout)),
    }
}

fn cmd_status_page(config: &Config, out: Option<PathBuf>) -> Result<()> {
    debug!(?out, "cmd_status_page: called");
    let history = FileHistory::open(&config.history.path)
        .with_context(|| format!("Failed to open history at {}", config.history.path.display()))?;

    let (updated_at, deltas) = match history.latest_deltas()? {
        Some(found) => found,
        None => {
            println!("{}", "No history recorded yet; rendering an empty page.".yellow());
            (Utc::now(), Vec::new())
        }
    };

    let html = render_status_page(&config.source.author, &deltas, updated_at)?;
    let out_dir = out.unwrap_or_else(|| config.status_page.output_dir.clone());
    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join("index.html");
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} wrote {}", "✓".green(), path.display());
    Ok(())
}
