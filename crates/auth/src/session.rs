//! Session storage
//!
//! Maps opaque, server-generated session IDs to the user who logged in.
//! Sessions are ephemeral: the in-memory store is the only backend and
//! nothing survives a restart.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::{generate_token, User, DEFAULT_SESSION_TTL_SECS};

/// Opaque session identifier
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random ID
    fn generate() -> Self {
        Self(generate_token())
    }

    /// Returns the ID as sent in the session cookie
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Session IDs are bearer credentials, keep them out of logs
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(<redacted>)")
    }
}

/// A stored session
#[derive(Debug, Clone)]
pub struct Session {
    /// The user this session belongs to
    pub user: User,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session stops resolving
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if this session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Trait for session storage
///
/// All operations are safe to call concurrently. None of them fail: an
/// unknown, revoked or expired session simply resolves to `None`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for a user and return its new ID.
    ///
    /// The ID is random and never reuses one that is still stored.
    async fn create(&self, user: User) -> SessionId;

    /// Look up the user for a session.
    async fn resolve(&self, session_id: &SessionId) -> Option<User>;

    /// Remove a session. Revoking an unknown ID is a no-op.
    async fn revoke(&self, session_id: &SessionId);

    /// Snapshot of all live sessions
    async fn active(&self) -> Vec<Session>;

    /// Remove expired sessions (cleanup task)
    ///
    /// Returns the number of sessions removed.
    async fn purge_expired(&self) -> usize;
}

/// In-memory session store
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Create a store with the default one hour TTL
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// Create a store whose sessions expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry for a session created at `now`, saturating at the calendar limits
    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl).unwrap_or(if self.ttl < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// Number of stored sessions, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: User) -> SessionId {
        let now = Utc::now();
        let session = Session {
            user,
            created_at: now,
            expires_at: self.expiry_from(now),
        };

        let mut sessions = self.sessions.write().await;
        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }
        sessions.insert(id.clone(), session);
        id
    }

    async fn resolve(&self, session_id: &SessionId) -> Option<User> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|session| !session.is_expired())
            .map(|session| session.user.clone())
    }

    async fn revoke(&self, session_id: &SessionId) {
        self.sessions.write().await.remove(session_id);
    }

    async fn active(&self) -> Vec<Session> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| !session.is_expired_at(now))
            .cloned()
            .collect()
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before_count - sessions.len()
    }
}
