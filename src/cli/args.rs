//! CLI argument definitions using clap
//!
//! Commands:
//! - trackdb save <collection>            (document or array of documents on stdin)
//! - trackdb put <handle>                 (document on stdin)
//! - trackdb delete <handle>
//! - trackdb revisions <handle> [--skip N] [--limit N]
//! - trackdb revision <collection> <rev>
//! - trackdb latest <handle>
//! - trackdb next <collection> <rev>
//! - trackdb previous <collection> <rev>
//! - trackdb repair <handle>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// trackdb - Revision-tracked documents
#[derive(Parser, Debug)]
#[command(name = "trackdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the store file
    #[arg(long, global = true, default_value = "./trackdb.json")]
    pub store: PathBuf,

    /// Path to a tracker configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Save documents read from stdin into a collection
    Save {
        /// Tracked collection
        collection: String,
    },

    /// Save the document read from stdin under an entity handle
    Put {
        /// Entity handle (`collection/key`)
        handle: String,
    },

    /// Delete an entity document, keeping its history
    Delete {
        /// Entity handle (`collection/key`)
        handle: String,
    },

    /// List revisions of an entity, newest first
    Revisions {
        /// Entity handle (`collection/key`)
        handle: String,

        /// Number of revisions to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Maximum number of revisions to return
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the content of one revision
    Revision { collection: String, rev: String },

    /// Show the current head revision of an entity
    Latest { handle: String },

    /// Show the revision written after the given one
    Next { collection: String, rev: String },

    /// Show the revision the given one replaced
    Previous { collection: String, rev: String },

    /// Reconcile the head pointer of an entity
    Repair { handle: String },
}

impl Command {
    /// Whether the command can change the store
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Save { .. } | Command::Put { .. } | Command::Delete { .. } | Command::Repair { .. }
        )
    }

    /// Whether the command takes a document on stdin
    pub fn reads_input(&self) -> bool {
        matches!(self, Command::Save { .. } | Command::Put { .. })
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
