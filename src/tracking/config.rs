//! Tracker Configuration
//!
//! Naming of the per-entity sub-collections, the system-field exclusion
//! set used when detecting changes, and conflict retry policy.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{TrackError, TrackResult};

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Suffix of the snapshot collection (default: "_history")
    #[serde(default = "default_history_suffix")]
    pub history_suffix: String,

    /// Suffix of the edge collection (default: "_edges")
    #[serde(default = "default_edges_suffix")]
    pub edges_suffix: String,

    /// Suffix of the graph grouping (default: "_revGraph")
    #[serde(default = "default_graph_suffix")]
    pub graph_suffix: String,

    /// Fields ignored by change detection and stripped from snapshot reads.
    /// The store and tracking fields are ignored whether listed or not.
    #[serde(default = "default_system_fields")]
    pub system_fields: Vec<String>,

    /// How many times a conflicting write is re-classified and retried (default: 3)
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_history_suffix() -> String {
    "_history".to_string()
}

fn default_edges_suffix() -> String {
    "_edges".to_string()
}

fn default_graph_suffix() -> String {
    "_revGraph".to_string()
}

fn default_system_fields() -> Vec<String> {
    ["_id", "_key", "_rev", "_created", "_modified", "_parent"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_max_conflict_retries() -> u32 {
    3
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_suffix: default_history_suffix(),
            edges_suffix: default_edges_suffix(),
            graph_suffix: default_graph_suffix(),
            system_fields: default_system_fields(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> TrackResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| TrackError::Config(format!("Failed to read config: {}", e)))?;

        let config: TrackerConfig = serde_json::from_str(&content)
            .map_err(|e| TrackError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a config with a different retry budget
    pub fn with_max_conflict_retries(retries: u32) -> Self {
        Self {
            max_conflict_retries: retries,
            ..Default::default()
        }
    }

    /// Validate the collection suffixes
    pub fn validate(&self) -> TrackResult<()> {
        let suffixes = [
            ("history_suffix", &self.history_suffix),
            ("edges_suffix", &self.edges_suffix),
            ("graph_suffix", &self.graph_suffix),
        ];

        for (name, suffix) in suffixes {
            if suffix.is_empty() {
                return Err(TrackError::Config(format!("{} must not be empty", name)));
            }
            if suffix.contains('/') {
                return Err(TrackError::Config(format!(
                    "{} must not contain '/': '{}'",
                    name, suffix
                )));
            }
        }

        let unique: HashSet<&str> = suffixes.iter().map(|(_, s)| s.as_str()).collect();
        if unique.len() != suffixes.len() {
            return Err(TrackError::Config(
                "history, edges and graph suffixes must differ".to_string(),
            ));
        }

        Ok(())
    }
}
