//! Managed backend access.
//!
//! This module provides the REST view client, the magic-link auth client
//! and the process-wide session store.

pub mod auth;
pub mod client;
pub mod session;

pub use auth::AuthClient;
pub use client::{RestClient, ViewQuery};
pub use session::{Session, SessionStore};

use crate::error::BackendError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build the shared HTTP client with the configured timeout.
fn http_client(timeout_seconds: u64) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("purpose-dash/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(BackendError::Http)
}

/// Strip trailing slashes so paths can be appended with `format!`.
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Turn a non-success response into `BackendError::Api`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::from_body(status, &body))
}

/// Check the status and decode a JSON body.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://abc.supabase.co/"),
            "https://abc.supabase.co"
        );
        assert_eq!(
            normalize_base_url(" http://localhost:54321 "),
            "http://localhost:54321"
        );
    }

    #[test]
    fn test_http_client_builds() {
        assert!(http_client(5).is_ok());
    }
}
