//! CLI argument parsing for historystore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hs")]
#[command(author, version, about = "Inspect the stormwatch progress history", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the store directory from config
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the most recent entry
    Latest,

    /// List recent entries, newest first
    List {
        /// Maximum entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Count recorded entries
    Count,

    /// Show the latest entry strictly before a point in time
    Before {
        /// RFC 3339 timestamp, e.g. 2024-05-01T12:00:00Z
        #[arg(required = true)]
        timestamp: String,
    },
}
