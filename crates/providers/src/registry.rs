//! Agent construction.
//!
//! Reads the [`AgentConfig`], resolves authentication, and instantiates the
//! matching adapter.

use std::sync::Arc;

use ck_domain::agent::Agent;
use ck_domain::config::{AgentConfig, AgentKind};
use ck_domain::error::Result;

use crate::echo::EchoAgent;
use crate::openai_compat::OpenAiCompatAgent;

/// Build the agent described by `config`.
pub fn build_agent(config: &AgentConfig) -> Result<Arc<dyn Agent>> {
    let agent: Arc<dyn Agent> = match config.kind {
        AgentKind::OpenaiCompat => Arc::new(OpenAiCompatAgent::from_config(config)?),
        AgentKind::Echo => Arc::new(EchoAgent),
    };

    tracing::info!(
        agent_id = %agent.agent_id(),
        kind = ?config.kind,
        "agent ready"
    );

    Ok(agent)
}
