//! Choosing which session a run continues.
//!
//! The selector lists stored sessions through a [`SelectionPrompt`] and
//! resolves the user's answer to exactly one session: an existing one with
//! its transcript loaded, or a freshly created one.  Bad answers are
//! reported and asked again; they never pick a default.

use ck_domain::error::{Error, Result};
use ck_domain::message::Message;
use ck_domain::trace::TraceEvent;

use crate::store::{SessionId, SessionStore, SessionSummary};

/// A parsed answer to the selection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based index into the listing.
    Existing(usize),
    New,
}

/// Parse a selection against a listing of `available` sessions.
///
/// Accepts a 1-based number in range, or `n`/`N` for a new conversation.
pub fn parse_choice(input: &str, available: usize) -> Result<Choice> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("n") {
        return Ok(Choice::New);
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = trimmed.parse::<usize>() {
            if (1..=available).contains(&n) {
                return Ok(Choice::Existing(n - 1));
            }
        }
    }
    Err(Error::InvalidSelection(trimmed.to_owned()))
}

/// How a [`Selection`] came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// The store was empty, so a session was created without asking.
    FirstSession,
    /// The user asked for a new conversation.
    New,
    /// The user picked an existing session.
    Resumed,
}

/// The session a run continues with.
#[derive(Debug, Clone)]
pub struct Selection {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub kind: SelectionKind,
}

/// The interactive side of session selection.
pub trait SelectionPrompt {
    /// Show the available sessions, newest first.
    fn present(&mut self, sessions: &[SessionSummary]);

    /// Read one answer.  `None` means the input ended.
    fn ask(&mut self) -> Option<String>;

    /// Tell the user an answer could not be used.
    fn report(&mut self, error: &Error);
}

pub struct SessionSelector<'a> {
    store: &'a SessionStore,
}

impl<'a> SessionSelector<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// Resolve the session to continue.  Returns `Ok(None)` when the input
    /// ends before a choice is made.
    pub fn resolve<P>(&self, prompt: &mut P) -> Result<Option<Selection>>
    where
        P: SelectionPrompt + ?Sized,
    {
        let sessions = self.store.list()?;
        if sessions.is_empty() {
            return self.create(SelectionKind::FirstSession).map(Some);
        }

        prompt.present(&sessions);

        loop {
            let Some(input) = prompt.ask() else {
                return Ok(None);
            };

            match parse_choice(&input, sessions.len()) {
                Ok(Choice::New) => return self.create(SelectionKind::New).map(Some),
                Ok(Choice::Existing(idx)) => {
                    let session_id = sessions[idx].id.clone();
                    match self.store.load(&session_id) {
                        Ok(messages) => {
                            TraceEvent::SessionSelected {
                                session_id: session_id.to_string(),
                                is_new: false,
                                messages: messages.len(),
                            }
                            .emit();
                            return Ok(Some(Selection {
                                session_id,
                                messages,
                                kind: SelectionKind::Resumed,
                            }));
                        }
                        Err(e @ Error::CorruptTranscript(_)) => {
                            tracing::warn!(session_id = %session_id, error = %e, "cannot resume session");
                            prompt.report(&e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => prompt.report(&e),
            }
        }
    }

    fn create(&self, kind: SelectionKind) -> Result<Selection> {
        let session_id = self.store.create()?;
        TraceEvent::SessionSelected {
            session_id: session_id.to_string(),
            is_new: true,
            messages: 0,
        }
        .emit();
        Ok(Selection {
            session_id,
            messages: Vec::new(),
            kind,
        })
    }
}
