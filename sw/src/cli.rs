//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

/// Stormwatch - work-in-progress monitor
#[derive(Debug, Parser)]
#[command(
    name = "sw",
    about = "Watch an author's work-in-progress bars and announce changes",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(long = "log-stderr", global = true)]
    pub log_stderr: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitor until interrupted
    Run,

    /// Read the source once and show what would be reported
    Check {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Send a sample update through one sink
    SendTest {
        /// Sink to exercise
        #[arg(value_enum)]
        sink: SinkKind,
    },

    /// Render the status page from recorded history
    StatusPage {
        /// Output directory (defaults to status-page.output-dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Sinks addressable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Slack,
    Push,
    StatusPage,
}

impl SinkKind {
    /// Name the sink reports for itself
    pub fn sink_name(&self) -> &'static str {
        match self {
            SinkKind::Slack => "slack",
            SinkKind::Push => "push",
            SinkKind::StatusPage => "status-page",
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stormwatch")
        .join("logs")
        .join("stormwatch.log");
    debug!(?path, "get_log_path: returning path");
    path
}
