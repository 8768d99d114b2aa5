use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Interactive chat settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Readline history file.  `None` keeps history in memory only.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}
