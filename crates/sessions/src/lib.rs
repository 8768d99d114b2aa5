//! Session persistence for chatkeep.
//!
//! A SQLite-backed store of conversation transcripts, the JSON codec that
//! crosses the storage boundary, and the selector that resolves which
//! session a run resumes.

pub mod codec;
pub mod selector;
pub mod store;

pub use selector::{parse_choice, Choice, Selection, SelectionKind, SelectionPrompt, SessionSelector};
pub use store::{SessionId, SessionStore, SessionSummary};
