//! In-memory per-user sessions with per-user locking.
//!
//! Each user gets their own `Mutex<UserSession>`. Holding that lock for the
//! whole read-modify-write of a transition serializes a user's events while
//! different users proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::state::{UserId, UserSession};

type Slot = Arc<Mutex<UserSession>>;

/// In-memory session store keyed by user id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Slot>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get (or create) the slot for a user.
    async fn slot(&self, user_id: UserId) -> Slot {
        if let Some(slot) = self.sessions.read().await.get(&user_id) {
            return Arc::clone(slot);
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(UserSession::new(user_id)))),
        )
    }

    /// Snapshot of a user's session. Creates a default session on first read.
    pub async fn get(&self, user_id: UserId) -> UserSession {
        self.slot(user_id).await.lock().await.clone()
    }

    /// Replace a user's session.
    pub async fn set(&self, user_id: UserId, session: UserSession) {
        *self.slot(user_id).await.lock().await = session;
    }

    /// Clear all application fields for a user, keeping their language.
    pub async fn reset(&self, user_id: UserId) {
        self.slot(user_id).await.lock().await.reset_application();
    }

    /// Exclusive access to a user's session for a read-modify-write.
    ///
    /// Other calls for the same user wait until the guard is dropped.
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<UserSession> {
        self.slot(user_id).await.lock_owned().await
    }

    /// Number of users seen so far.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
