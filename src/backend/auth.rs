//! Passwordless (magic link) authentication.
//!
//! Sign-in is two steps: `request_magic_link` asks the auth service to
//! email a one-time link, and once the user follows it the browser lands
//! on the redirect URL with the session tokens in the fragment. That URL
//! is handed back to `session_from_callback`.

use crate::config::{AuthConfig, BackendConfig};
use crate::error::BackendError;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::session::{Session, TokenResponse};

/// Client for the auth service endpoints.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    redirect_url: String,
    timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    email: Option<String>,
}

impl AuthClient {
    pub fn new(backend: &BackendConfig, auth: &AuthConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: super::http_client(backend.timeout_seconds)?,
            base_url: super::normalize_base_url(&backend.url),
            anon_key: backend.anon_key.clone(),
            redirect_url: auth.redirect_url.clone(),
            timeout_seconds: backend.timeout_seconds,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        BackendError::from_transport(err, &self.base_url, self.timeout_seconds)
    }

    /// Ask the auth service to email a sign-in link.
    ///
    /// Success only means the email was accepted for delivery.
    pub async fn request_magic_link(&self, email: &str) -> Result<(), BackendError> {
        info!("Requesting sign-in link for {}", email);

        let response = self
            .http
            .post(self.endpoint("otp"))
            .header("apikey", &self.anon_key)
            .query(&[("redirect_to", self.redirect_url.as_str())])
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        super::check_status(response).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        debug!("Refreshing session");

        let response = self
            .http
            .post(self.endpoint("token"))
            .header("apikey", &self.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let tokens: TokenResponse = super::read_json(response).await?;
        Ok(Session::from_token_response(tokens, now_unix()))
    }

    /// Look up the email address the session belongs to.
    pub async fn user_email(&self, session: &Session) -> Result<Option<String>, BackendError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let user: UserResponse = super::read_json(response).await?;
        Ok(user.email)
    }

    /// Revoke the session's refresh token on the server.
    pub async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        super::check_status(response).await?;
        Ok(())
    }
}

/// Current time as unix seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build a session from the URL the sign-in link redirected to.
///
/// Tokens are read from the fragment, falling back to the query string.
/// An `error_description` in the URL is reported as the failure reason.
pub fn session_from_callback(callback: &str, now: i64) -> Result<Session, BackendError> {
    let url = Url::parse(callback.trim())
        .map_err(|e| BackendError::InvalidCallback(format!("{}: {}", callback, e)))?;

    let params = url
        .fragment()
        .filter(|f| !f.is_empty())
        .or_else(|| url.query())
        .ok_or_else(|| BackendError::InvalidCallback("no tokens in URL".to_string()))?;

    let pairs = parse_params(params)?;
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    if let Some(reason) = get("error_description").or_else(|| get("error")) {
        return Err(BackendError::InvalidCallback(reason));
    }

    let access_token = get("access_token")
        .ok_or_else(|| BackendError::InvalidCallback("missing access_token".to_string()))?;
    let refresh_token = get("refresh_token")
        .ok_or_else(|| BackendError::InvalidCallback("missing refresh_token".to_string()))?;

    let tokens = TokenResponse {
        access_token,
        refresh_token,
        expires_in: get("expires_in").and_then(|v| v.parse().ok()),
        expires_at: get("expires_at").and_then(|v| v.parse().ok()),
        token_type: get("token_type"),
        user: None,
    };

    Ok(Session::from_token_response(tokens, now))
}

/// Decode `a=1&b=2` form-encoded pairs.
fn parse_params(params: &str) -> Result<Vec<(String, String)>, BackendError> {
    let carrier = Url::parse(&format!("http://callback.invalid/?{}", params))
        .map_err(|e| BackendError::InvalidCallback(e.to_string()))?;
    Ok(carrier
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_session_from_fragment() {
        let session = session_from_callback(
            "http://localhost:3000/#access_token=abc.def.ghi&expires_in=3600&refresh_token=r1&token_type=bearer&type=magiclink",
            NOW,
        )
        .unwrap();

        assert_eq!(session.access_token, "abc.def.ghi");
        assert_eq!(session.refresh_token, "r1");
        assert_eq!(session.expires_at, NOW + 3600);
        assert_eq!(session.token_type, "bearer");
        assert!(session.email.is_none());
    }

    #[test]
    fn test_session_prefers_expires_at() {
        let session = session_from_callback(
            "http://localhost:3000/#access_token=a&expires_at=1700009999&expires_in=10&refresh_token=r",
            NOW,
        )
        .unwrap();
        assert_eq!(session.expires_at, 1_700_009_999);
    }

    #[test]
    fn test_session_from_query() {
        let session =
            session_from_callback("http://localhost:3000/?access_token=a&refresh_token=r", NOW)
                .unwrap();
        assert_eq!(session.access_token, "a");
    }

    #[test]
    fn test_callback_error_description() {
        let err = session_from_callback(
            "http://localhost:3000/#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid+or+has+expired",
            NOW,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid sign-in link: Email link is invalid or has expired"
        );
    }

    #[test]
    fn test_callback_missing_tokens() {
        assert!(session_from_callback("http://localhost:3000/", NOW).is_err());
        assert!(session_from_callback("http://localhost:3000/#refresh_token=r", NOW).is_err());
        assert!(session_from_callback("not a url", NOW).is_err());
    }

    #[test]
    fn test_endpoint() {
        let client = AuthClient::new(
            &BackendConfig {
                url: "https://abc.supabase.co".to_string(),
                anon_key: "anon".to_string(),
                timeout_seconds: 5,
            },
            &AuthConfig::default(),
        )
        .unwrap();
        assert_eq!(client.endpoint("otp"), "https://abc.supabase.co/auth/v1/otp");
    }
}
