use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use historystore::cli::{Cli, Command};
use historystore::config::Config;
use historystore::{HistoryEntry, HistoryStore};

type Snapshot = serde_json::Value;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn print_entry(entry: &HistoryEntry<Snapshot>) -> Result<()> {
    println!(
        "{} {}",
        entry.timestamp.to_rfc3339().cyan(),
        entry.id.dimmed()
    );
    println!("{}", serde_json::to_string_pretty(&entry.snapshot)?);
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("historystore opening {}", store_path.display());
    let store: HistoryStore<Snapshot> = HistoryStore::open(&store_path)?;

    match cli.command {
        Command::Latest => match store.latest()? {
            Some(entry) => print_entry(&entry)?,
            None => println!("No history entries"),
        },
        Command::List { limit } => {
            let entries = store.list(limit.unwrap_or(config.list_limit))?;
            if entries.is_empty() {
                println!("No history entries");
            }
            for entry in entries {
                print_entry(&entry)?;
            }
        }
        Command::Count => {
            println!("{}", store.count()?);
        }
        Command::Before { timestamp } => {
            let at: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp)
                .context(format!("Invalid timestamp: {}", timestamp))?
                .with_timezone(&Utc);
            match store.entry_before(at)? {
                Some(entry) => print_entry(&entry)?,
                None => println!("{} No entry before {}", "✗".red(), timestamp),
            }
        }
    }

    Ok(())
}
