/// Shared error type used across all chatkeep crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The durable medium could not be opened, read or written.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored transcript payload failed to decode.
    #[error("corrupt transcript: {0}")]
    CorruptTranscript(String),

    #[error("invalid selection: {0:?}")]
    InvalidSelection(String),

    /// The agent collaborator failed to produce a turn.
    #[error("agent: {0}")]
    Agent(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
