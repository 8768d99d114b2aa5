//! Terminal front-end: a rustyline editor that serves both the session
//! selector and the conversation loop.
//!
//! Replies and listings go to stdout; notices, warnings and errors go to
//! stderr so piping stdout captures only the conversation.

use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use ck_domain::error::Error;
use ck_sessions::{SelectionPrompt, SessionSummary};

use crate::runtime::{ChatConsole, Input};

const SELECT_PROMPT: &str = "\nSelect a conversation number or 'N' for new: ";

/// One line of the session listing, `position` being 1-based.
pub fn summary_line(position: usize, summary: &SessionSummary) -> String {
    let flag = if summary.corrupted { "  (corrupt)" } else { "" };
    format!(
        "[{position}] {}  |  created_at: {}  |  turns: {}{flag}",
        summary.id, summary.created_at, summary.turn_count
    )
}

pub struct ReadlineConsole {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl ReadlineConsole {
    pub fn new(history_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let _ = editor.load_history(path);
        }
        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Write readline history back to disk, if configured.
    pub fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                tracing::debug!(path = %path.display(), error = %e, "could not save readline history");
            }
        }
    }
}

impl ChatConsole for ReadlineConsole {
    fn read_line(&mut self, prompt: &str) -> Input {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str()).ok();
                }
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(e) => {
                tracing::warn!(error = %e, "readline failed");
                Input::Eof
            }
        }
    }

    fn reply(&mut self, text: &str) {
        println!("Agent: {text}");
    }

    fn notice(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn warn(&mut self, text: &str) {
        eprintln!("\x1B[33mwarning: {text}\x1B[0m");
    }

    fn error(&mut self, text: &str) {
        eprintln!("\x1B[31merror: {text}\x1B[0m");
    }
}

impl SelectionPrompt for ReadlineConsole {
    fn present(&mut self, sessions: &[SessionSummary]) {
        println!("\nPrevious conversations:");
        for (i, summary) in sessions.iter().enumerate() {
            println!("{}", summary_line(i + 1, summary));
        }
        println!("[N] New conversation");
    }

    fn ask(&mut self) -> Option<String> {
        self.editor.readline(SELECT_PROMPT).ok()
    }

    fn report(&mut self, error: &Error) {
        match error {
            Error::InvalidSelection(_) => eprintln!("Invalid selection. Try again."),
            other => eprintln!("Cannot resume that conversation ({other}). Pick another or 'N'."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck_sessions::SessionId;

    fn summary(turns: usize, corrupted: bool) -> SessionSummary {
        SessionSummary {
            id: SessionId::from("4f1c2a7e-0000-4000-8000-000000000000"),
            created_at: "2025-06-01T12:00:00.000000+00:00".into(),
            turn_count: turns,
            corrupted,
        }
    }

    #[test]
    fn summary_line_matches_listing_format() {
        assert_eq!(
            summary_line(1, &summary(4, false)),
            "[1] 4f1c2a7e-0000-4000-8000-000000000000  |  created_at: 2025-06-01T12:00:00.000000+00:00  |  turns: 4"
        );
    }

    #[test]
    fn corrupt_rows_are_flagged() {
        assert!(summary_line(2, &summary(0, true)).ends_with("turns: 0  (corrupt)"));
    }
}
