//! CLI command implementations
//!
//! Every invocation loads the store file, runs one operation through a
//! [`Tracker`], and writes the store back if the operation can modify it.
//! Partial results of a failed write are persisted too: the revision graph
//! tolerates them, and dropping them would hide what the store saw.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::store::MemoryStore;
use crate::tracking::{ListOptions, Tracker, TrackerConfig};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, runs the command and prints the response envelope.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let input = if cli.command.reads_input() {
        Some(read_request()?)
    } else {
        None
    };

    match execute(&cli, input) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run a parsed command with its stdin document, returning the response data
pub fn execute(cli: &Cli, input: Option<Value>) -> CliResult<Value> {
    let config = match &cli.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };

    let store = Arc::new(MemoryStore::load(&cli.store)?);
    let tracker = Tracker::with_config(store.clone(), config)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let result = rt.block_on(dispatch(&tracker, &cli.command, input));

    if cli.command.is_write() {
        store.save(&cli.store)?;
        tracing::debug!(store = %cli.store.display(), "store written");
    }
    tracing::debug!(metrics = ?tracker.metrics().snapshot(), "command finished");

    result
}

async fn dispatch(tracker: &Tracker, command: &Command, input: Option<Value>) -> CliResult<Value> {
    let data = match command {
        Command::Save { collection } => match require_input(input)? {
            Value::Array(documents) => {
                serde_json::to_value(tracker.save_all(collection, documents).await?)?
            }
            document => serde_json::to_value(tracker.save(collection, document).await?)?,
        },
        Command::Put { handle } => {
            serde_json::to_value(tracker.put(handle, require_input(input)?).await?)?
        }
        Command::Delete { handle } => {
            tracker.delete(handle).await?;
            json!({ "deleted": handle })
        }
        Command::Revisions { handle, skip, limit } => {
            let options = ListOptions {
                skip: *skip,
                limit: *limit,
            };
            serde_json::to_value(tracker.list(handle, options).await?)?
        }
        Command::Revision { collection, rev } => Value::Object(tracker.get(collection, rev).await?),
        Command::Latest { handle } => serde_json::to_value(tracker.latest(handle).await?)?,
        Command::Next { collection, rev } => {
            serde_json::to_value(tracker.next(collection, rev).await?)?
        }
        Command::Previous { collection, rev } => {
            serde_json::to_value(tracker.previous(collection, rev).await?)?
        }
        Command::Repair { handle } => serde_json::to_value(tracker.repair(handle).await?)?,
    };
    Ok(data)
}

fn require_input(input: Option<Value>) -> CliResult<Value> {
    input.ok_or_else(|| CliError::io_error("Command requires a JSON document on stdin"))
}
