use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine tuning knobs.
///
/// Applications typically embed this in their own config file; it
/// deserializes from TOML with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    /// Cap on the number of records the root stack keeps. When a push grows
    /// the root stack past the cap, the oldest record is evicted. 0 means
    /// unbounded. Nested stacks are never capped: a composite command's
    /// replay is positional against its recorded sub-steps.
    #[serde(default)]
    pub max_records: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self { max_records: 0 }
    }
}

impl HistoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self { max_records }
    }

    /// Load options from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read options file: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse options file: {}", e))
    }
}
