//! Offline agent that answers by repeating the utterance.
//!
//! Useful for trying out session handling without an API key.

use ck_domain::agent::{Agent, AgentRun};
use ck_domain::error::Result;
use ck_domain::message::Message;

pub struct EchoAgent;

#[async_trait::async_trait]
impl Agent for EchoAgent {
    async fn run(&self, utterance: &str, history: &[Message]) -> Result<AgentRun> {
        let reply = format!("You said: {utterance}");
        let mut messages = history.to_vec();
        messages.push(Message::user(utterance));
        messages.push(Message::assistant(reply.clone()));
        Ok(AgentRun { reply, messages })
    }

    fn agent_id(&self) -> &str {
        "echo"
    }
}
