//! In-memory session store

use super::state::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Identifies one conversation: a chat on a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey {
    pub channel: String,
    pub chat_id: String,
}

impl UserKey {
    pub fn new(channel: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
        }
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel, self.chat_id)
    }
}

/// Handle to one user's session.
///
/// Holding the lock is what serializes events for that user.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Session store.
///
/// The map itself is guarded separately from each session, so inserting or
/// removing users never waits on another user's in-flight event.
pub struct SessionStore {
    sessions: RwLock<HashMap<UserKey, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the user's session, creating a fresh one on first contact
    pub async fn get(&self, key: &UserKey) -> SessionHandle {
        if let Some(session) = self.sessions.read().await.get(key) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.clone())
            .or_insert_with(|| {
                let session = Session::new(key.to_string());
                tracing::info!("Created session {} for {}", session.id, key);
                Arc::new(Mutex::new(session))
            })
            .clone()
    }

    /// Get the user's session without creating one
    pub async fn find(&self, key: &UserKey) -> Option<SessionHandle> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Clear a session's state in place. Returns false if there was none.
    pub async fn reset(&self, key: &UserKey) -> bool {
        let Some(session) = self.find(key).await else {
            return false;
        };
        session.lock().await.reset();
        tracing::debug!("Reset session for {}", key);
        true
    }

    /// Drop a session entirely; the next `get` builds a new one
    pub async fn remove(&self, key: &UserKey) -> bool {
        let removed = self.sessions.write().await.remove(key).is_some();
        if removed {
            tracing::info!("Removed session for {}", key);
        }
        removed
    }

    /// Users that currently have a session
    pub async fn active_users(&self) -> Vec<UserKey> {
        let mut users: Vec<UserKey> = self.sessions.read().await.keys().cloned().collect();
        users.sort();
        users
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `max_idle_ms`.
    ///
    /// Sessions busy with an event are skipped.
    pub async fn cleanup_inactive(&self, max_idle_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|key, session| match session.try_lock() {
            Ok(guard) => {
                let keep = now - guard.last_activity() <= max_idle_ms;
                if !keep {
                    tracing::debug!("Evicting idle session for {}", key);
                }
                keep
            }
            Err(_) => true,
        });

        let cleaned = before - sessions.len();
        if cleaned > 0 {
            tracing::info!("Cleaned up {} inactive sessions", cleaned);
        }
        cleaned
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
