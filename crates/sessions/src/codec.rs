//! Transcript <-> JSON codec.
//!
//! A transcript is stored as a single JSON array of [`Message`] objects.
//! The empty transcript is `[]`.  `decode` is the left inverse of `encode`
//! and never panics on bad input: anything it cannot read comes back as
//! [`Error::CorruptTranscript`].

use ck_domain::error::{Error, Result};
use ck_domain::message::{Message, MESSAGE_SCHEMA_VERSION};

/// Encoding of the empty transcript, written for every new session.
pub const EMPTY_TRANSCRIPT: &str = "[]";

/// Serialize a transcript to its stored form.
pub fn encode(messages: &[Message]) -> Result<String> {
    serde_json::to_string(messages).map_err(Error::Json)
}

/// Parse a stored transcript.
///
/// Empty or whitespace-only input decodes to the empty transcript.
pub fn decode(raw: &str) -> Result<Vec<Message>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| Error::CorruptTranscript(format!("not a JSON array: {e}")))?;

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let version = item
                .get("v")
                .and_then(|v| v.as_u64())
                .unwrap_or(u64::from(MESSAGE_SCHEMA_VERSION));
            if version > u64::from(MESSAGE_SCHEMA_VERSION) {
                return Err(Error::CorruptTranscript(format!(
                    "message {idx} has schema version {version}, newest supported is {MESSAGE_SCHEMA_VERSION}"
                )));
            }
            serde_json::from_value(item)
                .map_err(|e| Error::CorruptTranscript(format!("message {idx}: {e}")))
        })
        .collect()
}

/// Count the messages in a stored transcript.
///
/// Returns `None` exactly when [`decode`] would fail, so a listing never
/// advertises a transcript that cannot be loaded.
pub fn count_messages(raw: &str) -> Option<usize> {
    decode(raw).ok().map(|messages| messages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck_domain::message::{ContentPart, Role};

    fn sample_transcript() -> Vec<Message> {
        vec![
            Message::user("open example.com"),
            Message::new(
                Role::Assistant,
                vec![ContentPart::ToolUse {
                    id: "call_1".into(),
                    name: "browser_navigate".into(),
                    input: serde_json::json!({"url": "https://example.com"}),
                }],
            ),
            Message::tool_result("call_1", "navigated"),
            Message::assistant("The page title is \"Example Domain\", ünïcödé ok."),
        ]
    }

    #[test]
    fn roundtrip_preserves_transcript() {
        let transcript = sample_transcript();
        let raw = encode(&transcript).unwrap();
        assert_eq!(decode(&raw).unwrap(), transcript);
    }

    #[test]
    fn empty_transcript_encodes_as_empty_array() {
        assert_eq!(encode(&[]).unwrap(), EMPTY_TRANSCRIPT);
        assert!(decode(EMPTY_TRANSCRIPT).unwrap().is_empty());
    }

    #[test]
    fn blank_input_decodes_to_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n\t").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_corrupt() {
        let err = decode("[{\"role\":").unwrap_err();
        assert!(matches!(err, Error::CorruptTranscript(_)));
    }

    #[test]
    fn non_array_is_corrupt() {
        let err = decode("{\"role\":\"user\"}").unwrap_err();
        assert!(matches!(err, Error::CorruptTranscript(_)));
    }

    #[test]
    fn malformed_message_is_corrupt() {
        let err = decode(r#"[{"v":1,"role":"narrator","content":[],"timestamp":"2025-01-01T00:00:00Z"}]"#)
            .unwrap_err();
        match err {
            Error::CorruptTranscript(msg) => assert!(msg.starts_with("message 0")),
            other => panic!("expected CorruptTranscript, got {other:?}"),
        }
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let raw = r#"[{"v":99,"role":"user","content":[],"timestamp":"2025-01-01T00:00:00Z"}]"#;
        let err = decode(raw).unwrap_err();
        match err {
            Error::CorruptTranscript(msg) => assert!(msg.contains("schema version 99")),
            other => panic!("expected CorruptTranscript, got {other:?}"),
        }
    }

    #[test]
    fn count_agrees_with_decode() {
        let raw = encode(&sample_transcript()).unwrap();
        assert_eq!(count_messages(&raw), Some(4));
        assert_eq!(count_messages("[]"), Some(0));
        assert_eq!(count_messages(""), Some(0));

        for bad in [
            "not json",
            "{}",
            r#"[{"kind":"request"},{"kind":"response"}]"#,
            r#"[1,"x",{"v":99}]"#,
        ] {
            assert_eq!(count_messages(bad), None, "{bad}");
            assert!(decode(bad).is_err(), "{bad}");
        }
    }
}
