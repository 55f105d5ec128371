//! Session lifecycle: Anonymous <-> Authenticated.
//!
//! A [`Session`] is created on login, rehydrated from the [`SessionStore`]
//! on startup (only if its token has not expired), and dropped on logout or
//! when the server answers 401.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::decode_claims;
use crate::error::{SessionError, StoreError};
use crate::storage::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a bearer token, reading its expiry claim.
    pub fn from_token(token: impl Into<String>, username: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        let expires_at = decode_claims(&token)?.expires_at()?;
        Ok(Self {
            token,
            username: username.into(),
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Fails with [`SessionError::Expired`] if the token is no longer live.
    pub fn ensure_live(self, now: DateTime<Utc>) -> Result<Self, SessionError> {
        if self.is_expired_at(now) {
            Err(SessionError::Expired)
        } else {
            Ok(self)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(session) => Some(session),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Restore the persisted session, if any.
///
/// A token that is malformed, expired, or stored without its username is
/// discarded and the store is cleared; the result is then `Anonymous`.
/// Only storage failures are reported as errors.
pub fn rehydrate(store: &SessionStore, now: DateTime<Utc>) -> Result<SessionState, StoreError> {
    let stored = store.load()?;
    let (token, username) = match (stored.token, stored.username) {
        (None, None) => return Ok(SessionState::Anonymous),
        (Some(token), Some(username)) => (token, username),
        _ => {
            debug!("Discarding half-persisted session");
            store.clear()?;
            return Ok(SessionState::Anonymous);
        }
    };

    match Session::from_token(token, username).and_then(|s| s.ensure_live(now)) {
        Ok(session) => {
            info!(username = %session.username, expires_at = %session.expires_at, "Session restored");
            Ok(SessionState::Authenticated(session))
        }
        Err(e) => {
            debug!("Discarding stored session: {}", e);
            store.clear()?;
            Ok(SessionState::Anonymous)
        }
    }
}

/// Persist a freshly established session.
pub fn persist(store: &SessionStore, session: &Session) -> Result<(), StoreError> {
    store.save(&session.token, &session.username)
}

/// Forget the persisted session.
pub fn forget(store: &SessionStore) -> Result<(), StoreError> {
    store.clear()
}
