use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how the SQLite session database is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file.  Relative paths resolve against the working directory.
    #[serde(default = "d_store_path")]
    pub path: PathBuf,

    /// How long a writer waits on a lock held by another connection or
    /// process before giving up with `StoreUnavailable`.
    #[serde(default = "d_5000")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: d_store_path(),
            busy_timeout_ms: 5_000,
        }
    }
}

fn d_store_path() -> PathBuf {
    PathBuf::from("sessions.db")
}

fn d_5000() -> u64 {
    5_000
}
