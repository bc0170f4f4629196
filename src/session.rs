//! Server-side session store
//!
//! Maps unguessable cookie-addressed session ids to the authenticated
//! GitHub user and the delegated access token. Sessions are process-local
//! and TTL-bounded; expired entries are dropped lazily on lookup, with an
//! explicit sweep for periodic cleanup.
//!
//! The store also tracks pending OAuth `state` parameters between the
//! authorize redirect and the callback.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Pending OAuth states expire long before real sessions do
const STATE_TTL_MINUTES: i64 = 10;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID
    pub fn new() -> Self {
        Self(format!(
            "sess-{}-{}",
            Utc::now().format("%Y%m%d%H%M%S"),
            random_suffix()
        ))
    }

    /// Create from an existing string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an unguessable suffix. Session ids are bearer credentials,
/// so this must be cryptographically random, not timestamp-derived.
fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Authenticated GitHub user attached to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A live authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user: SessionUser,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-process, TTL-bounded session store
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
    /// OAuth state parameters awaiting the callback leg
    pending_states: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    /// Create a store with the given session lifetime
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours as i64),
            sessions: Mutex::new(HashMap::new()),
            pending_states: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session for an authenticated user, returning its id
    pub async fn insert(&self, user: SessionUser, access_token: String) -> SessionId {
        let id = SessionId::new();
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            user,
            access_token,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.lock().await;
        sessions.insert(id.as_str().to_string(), session);
        id
    }

    /// Look up a live session; expired entries are removed and not returned
    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(id) {
            Some(session) if session.expires_at > Utc::now() => Some(session.clone()),
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    /// Drop a session (logout)
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(id).is_some()
    }

    /// Drop all expired sessions and stale OAuth states (call periodically)
    pub async fn sweep(&self) {
        let now = Utc::now();

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.expires_at > now);
        drop(sessions);

        let mut states = self.pending_states.lock().await;
        states.retain(|_, issued| now - *issued < Duration::minutes(STATE_TTL_MINUTES));
    }

    /// Number of live sessions (for tests and diagnostics)
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Issue a fresh OAuth state parameter for the authorize redirect
    pub async fn issue_state(&self) -> String {
        let state = format!("st-{}", random_suffix());
        let mut states = self.pending_states.lock().await;
        states.insert(state.clone(), Utc::now());
        state
    }

    /// Consume an OAuth state on callback; false means unknown or expired
    pub async fn take_state(&self, state: &str) -> bool {
        let mut states = self.pending_states.lock().await;
        match states.remove(state) {
            Some(issued) => Utc::now() - issued < Duration::minutes(STATE_TTL_MINUTES),
            None => false,
        }
    }
}
