//! Login view: magic link sign-in and sign-out.

use tracing::{info, warn};

use crate::backend::auth::{now_unix, session_from_callback};
use crate::backend::{AuthClient, Session, SessionStore};
use crate::error::BackendError;

/// Step one: have the auth service email a sign-in link.
pub async fn request_link(auth: &AuthClient, email: &str) -> Result<(), BackendError> {
    let email = email.trim();
    auth.request_magic_link(email).await?;
    info!("Sign-in link sent to {}", email);
    Ok(())
}

/// Step two: complete sign-in from the URL the link redirected to.
///
/// The user's email is looked up for display; failing to find it does not
/// fail the sign-in.
pub async fn complete_sign_in(
    auth: &AuthClient,
    store: &SessionStore,
    callback: &str,
) -> Result<Session, BackendError> {
    let mut session = session_from_callback(callback, now_unix())?;

    match auth.user_email(&session).await {
        Ok(email) => session.email = email,
        Err(e) => warn!("Could not look up signed-in user: {}", e),
    }

    store.set(session.clone())?;
    info!("Session saved to {}", store.path().display());
    Ok(session)
}

/// Sign out. The local session is cleared even if the server call fails.
///
/// Returns whether a session was present.
pub async fn sign_out(auth: &AuthClient, store: &SessionStore) -> Result<bool, BackendError> {
    let Some(session) = store.current() else {
        return Ok(false);
    };

    if let Err(e) = auth.sign_out(&session).await {
        warn!("Server sign-out failed: {}", e);
    }
    store.clear()?;
    Ok(true)
}
