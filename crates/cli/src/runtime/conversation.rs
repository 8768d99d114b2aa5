//! The turn-taking loop.
//!
//! ```text
//! AwaitingInput ──utterance──▶ AgentRunning ──reply──▶ Persisting ──▶ AwaitingInput
//!       │                            │
//!       │ exit / quit / EOF / ^C     └──agent error──▶ AwaitingInput (turn dropped)
//!       ▼
//!     Ended
//! ```
//!
//! The agent's returned transcript replaces ours wholesale and is saved
//! before the reply is shown.  If the save fails the reply is still shown
//! and a warning is raised; the next successful save catches the store up.

use std::sync::Arc;
use std::time::Instant;

use ck_domain::agent::Agent;
use ck_domain::error::Error;
use ck_domain::message::Message;
use ck_domain::trace::TraceEvent;
use ck_sessions::{Selection, SessionId, SessionStore};

/// Prompt shown when waiting for the next utterance.
pub const USER_PROMPT: &str = "you: ";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Console seam
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One read from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// End of input (Ctrl+D, closed pipe).
    Eof,
    /// Ctrl+C.
    Interrupted,
}

/// Where the loop reads utterances and writes replies.
pub trait ChatConsole {
    fn read_line(&mut self, prompt: &str) -> Input;
    /// Show the agent's reply.
    fn reply(&mut self, text: &str);
    /// Informational output (farewells, status).
    fn notice(&mut self, text: &str);
    fn warn(&mut self, text: &str);
    fn error(&mut self, text: &str);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loop state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    AgentRunning,
    Persisting,
    Ended,
}

/// What happened to one turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Reply produced and transcript saved.
    Persisted { reply: String },
    /// Reply produced but the save failed; memory is ahead of the store.
    PersistFailed { reply: String, error: Error },
    /// The agent failed; the transcript is unchanged.
    AgentFailed { error: Error },
}

/// Returns true for the words that end a conversation.
pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One live conversation bound to a stored session.
pub struct Conversation {
    store: SessionStore,
    agent: Arc<dyn Agent>,
    session_id: SessionId,
    messages: Vec<Message>,
    state: LoopState,
    /// The in-memory transcript holds turns the store does not.
    unsaved: bool,
}

impl Conversation {
    pub fn new(store: SessionStore, agent: Arc<dyn Agent>, selection: Selection) -> Self {
        Self {
            store,
            agent,
            session_id: selection.session_id,
            messages: selection.messages,
            state: LoopState::AwaitingInput,
            unsaved: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Whether the store reflects every completed turn.
    pub fn is_durable(&self) -> bool {
        !self.unsaved
    }

    fn transition(&mut self, next: LoopState) {
        tracing::debug!(session_id = %self.session_id, from = ?self.state, to = ?next, "loop transition");
        self.state = next;
    }

    /// Drive the loop until the user leaves.
    pub async fn run<C>(&mut self, console: &mut C)
    where
        C: ChatConsole + ?Sized,
    {
        while self.state != LoopState::Ended {
            let line = match console.read_line(USER_PROMPT) {
                Input::Line(line) => line,
                Input::Eof | Input::Interrupted => {
                    console.notice("\nExiting…");
                    self.transition(LoopState::Ended);
                    break;
                }
            };

            if is_exit_command(&line) {
                console.notice("Goodbye!");
                self.transition(LoopState::Ended);
                break;
            }

            let utterance = line.trim();
            if utterance.is_empty() {
                continue;
            }

            match self.turn(utterance).await {
                TurnOutcome::Persisted { reply } => console.reply(&reply),
                TurnOutcome::PersistFailed { reply, error } => {
                    console.reply(&reply);
                    console.warn(&format!(
                        "could not save this turn ({error}); it is kept in memory and will be saved with the next turn"
                    ));
                }
                TurnOutcome::AgentFailed { error } => {
                    console.error(&format!("{error}"));
                }
            }
        }

        if self.unsaved {
            console.warn("the last turns of this conversation were not saved");
        }
    }

    /// Run a single turn: agent call, transcript adoption, save.
    pub async fn turn(&mut self, utterance: &str) -> TurnOutcome {
        self.transition(LoopState::AgentRunning);
        let started = Instant::now();

        let run = match self.agent.run(utterance, &self.messages).await {
            Ok(run) => run,
            Err(e) => {
                let error = match e {
                    Error::Agent(_) => e,
                    other => Error::Agent(other.to_string()),
                };
                TraceEvent::TurnFailed {
                    session_id: self.session_id.to_string(),
                    error: error.to_string(),
                }
                .emit();
                self.transition(LoopState::AwaitingInput);
                return TurnOutcome::AgentFailed { error };
            }
        };

        self.messages = run.messages;
        self.unsaved = true;
        self.transition(LoopState::Persisting);

        let outcome = match self.store.save_async(&self.session_id, &self.messages).await {
            Ok(()) => {
                self.unsaved = false;
                TraceEvent::TurnCompleted {
                    session_id: self.session_id.to_string(),
                    messages: self.messages.len(),
                    duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                }
                .emit();
                TurnOutcome::Persisted { reply: run.reply }
            }
            Err(error) => {
                TraceEvent::PersistFailed {
                    session_id: self.session_id.to_string(),
                    error: error.to_string(),
                }
                .emit();
                TurnOutcome::PersistFailed {
                    reply: run.reply,
                    error,
                }
            }
        };

        self.transition(LoopState::AwaitingInput);
        outcome
    }
}
