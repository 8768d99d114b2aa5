use serde::Serialize;

/// Structured trace events emitted across all chatkeep crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    StoreOpened {
        path: String,
        sessions: usize,
    },
    SessionCreated {
        session_id: String,
        created_at: String,
    },
    SessionLoaded {
        session_id: String,
        messages: usize,
        found: bool,
    },
    TranscriptSaved {
        session_id: String,
        messages: usize,
        bytes: usize,
        updated: bool,
    },
    CorruptTranscriptSkipped {
        session_id: String,
        error: String,
    },
    SessionSelected {
        session_id: String,
        is_new: bool,
        messages: usize,
    },
    TurnCompleted {
        session_id: String,
        messages: usize,
        duration_ms: u64,
    },
    TurnFailed {
        session_id: String,
        error: String,
    },
    PersistFailed {
        session_id: String,
        error: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ck_event");
    }
}
