use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use metalog_kernel::config::{Config, LoggingConfig};
use metalog_kernel::publish::{FanOutPublisher, Publisher, TableStoreSink};
use metalog_kernel::query::View;
use metalog_kernel::replay::replay_into;
use metalog_kernel::table::{InMemoryTableStore, TableStore};

mod logging;

/// Reference topics replayed when none are given.
const DEFAULT_TOPICS: [&str; 3] = ["exchange_info", "system_status", "account_info"];

/// Metalog publishing CLI
#[derive(Parser, Debug)]
#[command(name = "metalog")]
#[command(about = "Durable fan-out publishing of exchange metadata snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish JSON-lines envelopes through the logged table publisher
    Ingest {
        /// Path to TOML config (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines file of {"topic": ..., "message": ...} envelopes
        #[arg(long)]
        input: PathBuf,
    },

    /// Rebuild tables from topic logs and print them
    Replay {
        /// Directory holding <topic>.log files
        #[arg(long)]
        dir: PathBuf,

        /// Topic to replay (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Print a single view: rate_limits, symbols, exchange_status, account_info
        #[arg(long)]
        view: Option<String>,
    },
}

/// One line of ingest input.
#[derive(Debug, Deserialize)]
struct Envelope {
    topic: String,
    message: Value,
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct IngestOutput {
    published: usize,
    tables: BTreeMap<String, usize>,
}

fn table_sizes(store: &dyn TableStore) -> BTreeMap<String, usize> {
    store
        .table_names()
        .into_iter()
        .map(|name| {
            let size = store.read_all(&name).map_or(0, |t| t.len());
            (name, size)
        })
        .collect()
}

async fn ingest(config: Config, input: PathBuf) -> Result<()> {
    let data = fs::read_to_string(&input)
        .with_context(|| format!("cannot read {}", input.display()))?;

    let store = Arc::new(InMemoryTableStore::new());
    let mut publisher =
        FanOutPublisher::logged(config.publishing.log_sink_config(), store.clone())?;

    let mut published = 0;
    let mut outcome = Ok(());

    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let envelope: Envelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                outcome = Err(anyhow::Error::new(e)
                    .context(format!("{}:{}: invalid envelope", input.display(), idx + 1)));
                break;
            }
        };
        if let Err(e) = publisher.publish(&envelope.topic, &envelope.message) {
            outcome = Err(anyhow::Error::new(e).context(format!("publish of line {} failed", idx + 1)));
            break;
        }
        published += 1;
    }

    // Close even on failure so buffered lines reach disk.
    publisher.close().await?;
    outcome?;

    info!(published, "ingest complete");

    let output = IngestOutput {
        published,
        tables: table_sizes(store.as_ref()),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn replay(dir: PathBuf, topics: Vec<String>, view: Option<String>) -> Result<()> {
    let topics: Vec<&str> = if topics.is_empty() {
        DEFAULT_TOPICS.to_vec()
    } else {
        topics.iter().map(String::as_str).collect()
    };

    let view = view
        .map(|name| View::from_name(&name).ok_or_else(|| anyhow::anyhow!("unknown view '{name}'")))
        .transpose()?;

    let store = Arc::new(InMemoryTableStore::new());
    let mut sink = TableStoreSink::new(store.clone());
    let applied = replay_into(&mut sink, &dir, &topics)?;
    info!(applied, "replay complete");

    let output = match view {
        Some(view) => view.render(store.as_ref())?,
        None => {
            let tables: serde_json::Map<String, Value> = store
                .table_names()
                .into_iter()
                .filter_map(|name| {
                    let table = store.read_all(&name)?;
                    Some((name, Value::Object(table.into_iter().collect())))
                })
                .collect();
            Value::Object(tables)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest { config, input } => {
            // ----------------------------
            // Load config
            // ----------------------------
            let config = match config {
                Some(path) => Config::from_file(path)?,
                None => Config::default(),
            };
            logging::init_logging(&config.logging)?;

            ingest(config, input).await
        }
        Command::Replay { dir, topics, view } => {
            logging::init_logging(&LoggingConfig::default())?;
            replay(dir, topics, view)
        }
    }
}
