use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent collaborator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub kind: AgentKind,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the API key.  `None` sends no
    /// `Authorization` header (local servers such as Ollama).
    #[serde(default = "d_api_key_env")]
    pub api_key_env: Option<String>,
    /// Prepended to every request; never stored in the transcript.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// HTTP timeout for one completion request.
    #[serde(default = "d_120")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kind: AgentKind::OpenaiCompat,
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            system_prompt: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Any endpoint that follows the OpenAI chat completions contract.
    #[default]
    OpenaiCompat,
    /// Offline agent that echoes the utterance back.
    Echo,
}

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn d_model() -> String {
    "gpt-4o-mini".into()
}

fn d_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".into())
}

fn d_120() -> u64 {
    120
}
