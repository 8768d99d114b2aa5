//! OpenAI-compatible agent.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, Together, and any other
//! endpoint that follows the OpenAI chat completions contract.  One turn is
//! one non-streaming completion request carrying the whole transcript.

use std::time::Duration;

use ck_domain::agent::{Agent, AgentRun};
use ck_domain::config::AgentConfig;
use ck_domain::error::{Error, Result};
use ck_domain::message::{ContentPart, Message, Role};
use serde_json::Value;

use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiCompatAgent {
    id: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatAgent {
    /// Create a new agent from the deserialized agent config.
    ///
    /// The API key is read from the environment at this point.
    pub fn from_config(cfg: &AgentConfig) -> Result<Self> {
        let api_key = resolve_api_key(cfg)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: format!("openai_compat:{}", cfg.model),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
            system_prompt: cfg.system_prompt.clone(),
            client,
        })
    }

    fn build_chat_body(&self, messages: &[Message]) -> Value {
        let mut wire: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            wire.push(serde_json::json!({"role": "system", "content": prompt}));
        }
        wire.extend(messages.iter().map(msg_to_openai));

        serde_json::json!({
            "model": self.model,
            "messages": wire,
            "stream": false,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => tool_result_to_openai(msg),
        Role::Assistant => assistant_to_openai(msg),
        _ => serde_json::json!({
            "role": role_to_str(msg.role),
            "content": msg.text(),
        }),
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});
    let mut tool_calls: Vec<Value> = Vec::new();

    for part in &msg.content {
        if let ContentPart::ToolUse { id, name, input } = part {
            tool_calls.push(serde_json::json!({
                "id": id,
                "type": "function",
                "function": {
                    "name": name,
                    "arguments": input.to_string(),
                }
            }));
        }
    }

    let text = msg.text();
    obj["content"] = if text.is_empty() {
        Value::Null
    } else {
        Value::String(text)
    };
    if !tool_calls.is_empty() {
        obj["tool_calls"] = Value::Array(tool_calls);
    }
    obj
}

fn tool_result_to_openai(msg: &Message) -> Value {
    for part in &msg.content {
        if let ContentPart::ToolResult {
            tool_use_id,
            content,
            ..
        } = part
        {
            return serde_json::json!({
                "role": "tool",
                "tool_call_id": tool_use_id,
                "content": content,
            });
        }
    }
    serde_json::json!({"role": "tool", "tool_call_id": "", "content": msg.text()})
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Turn the first choice of a completion into an assistant [`Message`].
fn parse_chat_response(body: &Value) -> Result<Message> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "openai_compat".into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: "openai_compat".into(),
        message: "no message in choice".into(),
    })?;

    let mut parts = Vec::new();
    if let Some(text) = message.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
    }
    parts.extend(parse_openai_tool_calls(message));

    Ok(Message::new(Role::Assistant, parts))
}

fn parse_openai_tool_calls(message: &Value) -> Vec<ContentPart> {
    let arr = match message.get("tool_calls").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|tc| {
            let id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let name = func.get("name")?.as_str()?.to_string();
            let args_str = func.get("arguments")?.as_str().unwrap_or("{}");
            let input: Value =
                serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
            Some(ContentPart::ToolUse { id, name, input })
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl Agent for OpenAiCompatAgent {
    async fn run(&self, utterance: &str, history: &[Message]) -> Result<AgentRun> {
        let mut messages = history.to_vec();
        messages.push(Message::user(utterance));

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(&messages);

        tracing::debug!(agent = %self.id, url = %url, messages = messages.len(), "chat request");

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req.json(&body).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let reply = parse_chat_response(&resp_json)?;
        let reply_text = reply.text();
        messages.push(reply);

        Ok(AgentRun {
            reply: reply_text,
            messages,
        })
    }

    fn agent_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(system_prompt: Option<&str>) -> OpenAiCompatAgent {
        OpenAiCompatAgent::from_config(&AgentConfig {
            base_url: "http://localhost:8080/v1/".into(),
            model: "test-model".into(),
            api_key_env: None,
            system_prompt: system_prompt.map(String::from),
            ..AgentConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(agent(None).base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn body_prepends_system_prompt() {
        let body = agent(Some("You drive a browser.")).build_chat_body(&[Message::user("hi")]);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[0]["content"], "You drive a browser.");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[1]["content"], "hi");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn assistant_tool_use_maps_to_tool_calls() {
        let msg = Message::new(
            Role::Assistant,
            vec![ContentPart::ToolUse {
                id: "call_1".into(),
                name: "browser_navigate".into(),
                input: serde_json::json!({"url": "https://example.com"}),
            }],
        );
        let wire = msg_to_openai(&msg);
        assert_eq!(wire["content"], Value::Null);
        assert_eq!(wire["tool_calls"][0]["id"], "call_1");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "browser_navigate");
    }

    #[test]
    fn tool_result_maps_to_tool_message() {
        let wire = msg_to_openai(&Message::tool_result("call_1", "ok"));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
        assert_eq!(wire["content"], "ok");
    }

    #[test]
    fn parses_text_response() {
        let body = serde_json::json!({
            "model": "test-model",
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}]
        });
        let msg = parse_chat_response(&body).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text(), "Hello!");
    }

    #[test]
    fn parses_tool_calls() {
        let body = serde_json::json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "browser_click", "arguments": "{\"ref\":\"e12\"}"}}]
            }}]
        });
        let msg = parse_chat_response(&body).unwrap();
        assert_eq!(
            msg.content,
            vec![ContentPart::ToolUse {
                id: "c1".into(),
                name: "browser_click".into(),
                input: serde_json::json!({"ref": "e12"}),
            }]
        );
    }

    #[test]
    fn empty_choices_is_a_provider_error() {
        let err = parse_chat_response(&serde_json::json!({"choices": []})).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
