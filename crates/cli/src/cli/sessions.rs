//! `chatkeep sessions` and `chatkeep show`: read-only views of the store.

use ck_domain::config::Config;
use ck_domain::message::{ContentPart, Message, Role};
use ck_sessions::SessionId;

use crate::cli::open_store;
use crate::console::summary_line;

/// Print every stored session, newest first.
pub fn list(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let sessions = store.list()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for (i, summary) in sessions.iter().enumerate() {
        println!("{}", summary_line(i + 1, summary));
    }
    Ok(())
}

/// Print the transcript of one session.
pub fn show(config: &Config, id: String, json_output: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let session_id = SessionId::from(id);
    if store.get(&session_id)?.is_none() {
        anyhow::bail!("no session with id {session_id}");
    }
    let messages = store.load(&session_id)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    for msg in &messages {
        println!("{}", render_message(msg));
    }
    Ok(())
}

/// One human-readable line per message.
pub fn render_message(msg: &Message) -> String {
    let who = match msg.role {
        Role::System => "system",
        Role::User => "you",
        Role::Assistant => "Agent",
        Role::Tool => "tool",
    };
    let body: Vec<String> = msg
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => text.clone(),
            ContentPart::ToolUse { name, input, .. } => format!("[tool call {name} {input}]"),
            ContentPart::ToolResult {
                content, is_error, ..
            } => {
                if *is_error {
                    format!("[tool error: {content}]")
                } else {
                    format!("[tool result: {content}]")
                }
            }
        })
        .collect();
    format!("{who}: {}", body.join(" "))
}
