//! Conversation runtime: the turn loop and its console seam.

pub mod conversation;

pub use conversation::{
    is_exit_command, ChatConsole, Conversation, Input, LoopState, TurnOutcome, USER_PROMPT,
};
