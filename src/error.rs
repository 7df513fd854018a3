//! Backend error types.

use thiserror::Error;

/// Errors from the REST query and auth endpoints.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to backend at {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `message` is the backend's own text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No active session")]
    NoSession,

    #[error("Invalid sign-in link: {0}")]
    InvalidCallback(String),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Map a transport error the way the user should read it.
    pub fn from_transport(err: reqwest::Error, base_url: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout_seconds)
        } else if err.is_connect() {
            BackendError::Connect(base_url.to_string())
        } else {
            BackendError::Http(err)
        }
    }

    /// Build an API error from a response body.
    ///
    /// The auth service and the REST layer report errors under different
    /// keys; the first one present wins, otherwise the raw body is used.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["msg", "message", "error_description", "error"]
                    .iter()
                    .find_map(|key| json[*key].as_str().map(String::from))
            })
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        BackendError::Api { status, message }
    }
}
