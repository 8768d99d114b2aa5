use crate::error::Result;
use crate::message::Message;

/// The outcome of one agent turn.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Text shown to the user.
    pub reply: String,
    /// The full updated transcript, prior messages included.  Callers treat
    /// it as authoritative and replace their own copy with it.
    pub messages: Vec<Message>,
}

/// The response-generation collaborator driven by the conversation loop.
///
/// Implementations may take arbitrarily long and may perform their own
/// nested tool round-trips; none of that is visible to the caller.
#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    /// Run one turn for `utterance` on top of `history`.
    async fn run(&self, utterance: &str, history: &[Message]) -> Result<AgentRun>;

    /// A short identifier for logs (e.g. `"openai_compat:gpt-4o"`).
    fn agent_id(&self) -> &str;
}
