//! `chatkeep run`: one-shot execution command.
//!
//! Sends a single message, prints the reply and exits.  The turn is saved
//! like any interactive turn, so `--session` can continue it later.

use std::sync::Arc;

use ck_domain::config::Config;

use crate::cli::chat::{resume, start_new};
use crate::cli::open_store;
use crate::runtime::{Conversation, TurnOutcome};

/// Execute a single turn and print the reply.
pub async fn run(
    config: Arc<Config>,
    message: String,
    session: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let agent = ck_providers::build_agent(&config.agent)?;

    let selection = match session {
        Some(id) => resume(&store, id)?,
        None => start_new(&store)?,
    };

    let mut conversation = Conversation::new(store, agent, selection);
    let (reply, saved) = match conversation.turn(&message).await {
        TurnOutcome::Persisted { reply } => (reply, true),
        TurnOutcome::PersistFailed { reply, error } => {
            eprintln!("\x1B[33mwarning: reply not saved: {error}\x1B[0m");
            (reply, false)
        }
        TurnOutcome::AgentFailed { error } => return Err(error.into()),
    };

    if json_output {
        let out = serde_json::json!({
            "session_id": conversation.session_id(),
            "reply": reply,
            "saved": saved,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        eprintln!("session: {}", conversation.session_id());
        println!("{reply}");
    }

    Ok(())
}
