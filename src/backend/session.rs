//! Process-wide session state.
//!
//! The session is loaded once from the session file into a `SessionStore`.
//! Views read it through the store and can subscribe to changes; nothing
//! else reads the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::auth::{now_unix, AuthClient};
use crate::error::BackendError;

/// Tokens are refreshed this many seconds before they actually expire.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Lifetime assumed when the auth service does not report one.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as unix seconds.
    pub expires_at: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token payload returned by the auth service (and carried in sign-in links).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<TokenUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    #[serde(default)]
    pub email: Option<String>,
}

impl Session {
    pub fn from_token_response(tokens: TokenResponse, now: i64) -> Self {
        let expires_at = tokens
            .expires_at
            .unwrap_or_else(|| now + tokens.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS));

        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
            token_type: tokens.token_type.unwrap_or_else(default_token_type),
            email: tokens.user.and_then(|u| u.email),
        }
    }

    /// Whether the access token is expired (or about to be) at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_LEEWAY_SECS >= self.expires_at
    }

    /// Seconds until expiry; negative once expired.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}

/// Owner of the current session.
pub struct SessionStore {
    path: PathBuf,
    tx: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Load the session file at `path`, if any.
    ///
    /// A missing file means signed out. An unreadable or corrupt file is
    /// logged and also treated as signed out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match read_session_file(&path) {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring session file {}: {}", path.display(), e);
                None
            }
        };
        debug!(
            "Session store at {} ({})",
            path.display(),
            if session.is_some() { "signed in" } else { "signed out" }
        );

        let (tx, _rx) = watch::channel(session);
        Self { path, tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session as last loaded, set or refreshed. Expiry is not checked.
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Receive every subsequent session change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Persist and publish a new session.
    pub fn set(&self, session: Session) -> Result<(), BackendError> {
        write_session_file(&self.path, &session)?;
        self.tx.send_replace(Some(session));
        Ok(())
    }

    /// Forget the session, removing the session file.
    pub fn clear(&self) -> Result<(), BackendError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        self.tx.send_replace(None);
        Ok(())
    }

    /// The current session, refreshed first if it has expired.
    ///
    /// Returns `None` when signed out, or when an expired session cannot be
    /// refreshed (in which case it is cleared).
    pub async fn refresh(&self, auth: &AuthClient) -> Option<Session> {
        let session = self.current()?;
        if !session.is_expired(now_unix()) {
            return Some(session);
        }

        info!("Session expired, refreshing");
        match auth.refresh(&session.refresh_token).await {
            Ok(mut fresh) => {
                if fresh.email.is_none() {
                    fresh.email = session.email.clone();
                }
                if let Err(e) = self.set(fresh.clone()) {
                    warn!("Failed to save refreshed session: {}", e);
                }
                Some(fresh)
            }
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                if let Err(e) = self.clear() {
                    warn!("Failed to clear session: {}", e);
                }
                None
            }
        }
    }
}

fn read_session_file(path: &Path) -> Result<Option<Session>, BackendError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_session_file(path: &Path, session: &Session) -> Result<(), BackendError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
