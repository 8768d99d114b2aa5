//! Shared utility functions for agent adapters.

use ck_domain::config::AgentConfig;
use ck_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key named by `api_key_env`.
///
/// `Ok(None)` when no variable is configured (keyless local servers).
pub(crate) fn resolve_api_key(cfg: &AgentConfig) -> Result<Option<String>> {
    match &cfg.api_key_env {
        None => Ok(None),
        Some(env_var) => std::env::var(env_var).map(Some).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            ))
        }),
    }
}
