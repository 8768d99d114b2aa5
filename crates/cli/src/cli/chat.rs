//! `chatkeep chat`: interactive REPL command.
//!
//! Opens the session store, resolves which session to continue (picker,
//! `--new` or `--session`), then hands the terminal to the conversation
//! loop until the user leaves.

use std::sync::Arc;

use anyhow::Context;

use ck_domain::config::Config;
use ck_sessions::{Selection, SelectionKind, SessionId, SessionSelector, SessionStore};

use crate::cli::open_store;
use crate::console::ReadlineConsole;
use crate::runtime::Conversation;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
pub async fn chat(
    config: Arc<Config>,
    new: bool,
    session: Option<String>,
) -> anyhow::Result<()> {
    // 1. Storage and agent first: both are fatal if unavailable.
    let store = open_store(&config)?;
    let agent = ck_providers::build_agent(&config.agent)?;

    // 2. Readline editor, shared by the picker and the loop.
    let mut console = ReadlineConsole::new(config.chat.history_file.clone())?;

    // 3. Decide which session this run continues.
    let selection = if new {
        start_new(&store)?
    } else if let Some(id) = session {
        resume(&store, id)?
    } else {
        match SessionSelector::new(&store).resolve(&mut console)? {
            Some(selection) => selection,
            None => {
                eprintln!("\nExiting…");
                return Ok(());
            }
        }
    };
    announce(&selection);

    // 4. Conversation loop.
    let mut conversation = Conversation::new(store, agent, selection);
    conversation.run(&mut console).await;

    // 5. Save history.
    console.save_history();
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session resolution helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Create a fresh session.
pub(crate) fn start_new(store: &SessionStore) -> anyhow::Result<Selection> {
    let session_id = store.create()?;
    Ok(Selection {
        session_id,
        messages: Vec::new(),
        kind: SelectionKind::New,
    })
}

/// Load an existing session by id.  Unknown ids are an error here: the
/// user named the session explicitly, so silently starting empty would
/// hide a typo.
pub(crate) fn resume(store: &SessionStore, id: String) -> anyhow::Result<Selection> {
    let session_id = SessionId::from(id);
    if store.get(&session_id)?.is_none() {
        anyhow::bail!("no session with id {session_id}");
    }
    let messages = store
        .load(&session_id)
        .with_context(|| format!("cannot resume session {session_id}"))?;
    Ok(Selection {
        session_id,
        messages,
        kind: SelectionKind::Resumed,
    })
}

fn announce(selection: &Selection) {
    let id = &selection.session_id;
    match selection.kind {
        SelectionKind::FirstSession => {
            println!("\nNo previous conversations. New session: {id}\n")
        }
        SelectionKind::New => println!("\nNew session: {id}\n"),
        SelectionKind::Resumed => println!(
            "\nResumed session: {id} (turns: {})\n",
            selection.messages.len()
        ),
    }
}
