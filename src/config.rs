use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Engine configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// File holding the persisted storage area
    pub data_file: PathBuf,

    /// Quiet period before a history snapshot is taken, in seconds
    pub snapshot_debounce_secs: i64,

    /// Maximum number of history snapshots kept per note
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_file = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jotter")
            .join("notes.json");

        Self {
            data_file,
            snapshot_debounce_secs: 60,
            history_capacity: 10,
        }
    }
}

impl Config {
    /// The snapshot debounce window as a duration.
    pub fn snapshot_debounce(&self) -> Duration {
        Duration::seconds(self.snapshot_debounce_secs)
    }
}
