pub mod chat;
pub mod config;
pub mod run;
pub mod sessions;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ck_domain::config::Config;
use ck_sessions::SessionStore;

/// chatkeep: resumable conversations with an agent.
#[derive(Debug, Parser)]
#[command(name = "chatkeep", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive conversation (default when no subcommand is given).
    Chat {
        /// Skip the session picker and start a new conversation.
        #[arg(long)]
        new: bool,
        /// Resume this session id without prompting.
        #[arg(long, conflicts_with = "new")]
        session: Option<String>,
    },
    /// Send a single message and print the reply.
    Run {
        /// The message to send.
        message: String,
        /// Session to continue (a new one is created when omitted).
        #[arg(long)]
        session: Option<String>,
        /// Print the reply and session id as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List stored sessions, newest first.
    Sessions {
        /// Output the listing as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the transcript of a session.
    Show {
        /// Session id.
        id: String,
        /// Output the raw messages as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `CHATKEEP_CONFIG` (or
/// `chatkeep.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.  A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("CHATKEEP_CONFIG").unwrap_or_else(|_| "chatkeep.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

/// Open the session store.  Failing here is the one unrecoverable store
/// error: without a database nothing can be resumed or saved.
pub fn open_store(config: &Config) -> anyhow::Result<SessionStore> {
    SessionStore::open(&config.store)
        .with_context(|| format!("opening session store at {}", config.store.path.display()))
}
