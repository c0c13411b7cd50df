//! Client registry
//!
//! Tracks the sessions of connected viewers. Membership changes and
//! snapshotting share one lock; enumeration always works on a copy so a
//! session closing mid-broadcast cannot disturb the iteration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::client::{Session, SessionId, SessionState};
use crate::error::ClientError;

/// Registry for tracking live sessions
#[derive(Default)]
pub struct ClientRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id no other session of this registry has used.
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Inserts a session. Re-adding a member keeps the existing handle, and
    /// closed sessions are never admitted.
    ///
    /// Returns true if the session was inserted.
    pub async fn add(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions.lock().await;
        insert_new(&mut sessions, session)
    }

    /// Inserts a session unless the registry already holds `max_clients`.
    pub async fn try_add(
        &self,
        session: Arc<Session>,
        max_clients: usize,
    ) -> Result<bool, ClientError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.id()) {
            return Ok(false);
        }
        if sessions.len() >= max_clients {
            return Err(ClientError::RegistryFull(max_clients));
        }
        Ok(insert_new(&mut sessions, session))
    }

    /// Removes a session and marks it closed, which also wakes its
    /// connection task to close the socket. Absent ids are a no-op.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.lock().await.remove(&id);
        if let Some(session) = &removed {
            session.mark_closed();
        }
        removed
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Copies the current membership.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().await.values().cloned().collect()
    }

    /// Visits every member of a snapshot taken at call time.
    ///
    /// The lock is released before the visitor runs.
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<Session>),
    {
        for session in self.snapshot().await {
            visitor(&session);
        }
    }
}

fn insert_new(sessions: &mut HashMap<SessionId, Arc<Session>>, session: Arc<Session>) -> bool {
    if session.state() == SessionState::Closed {
        return false;
    }
    let mut inserted = false;
    sessions.entry(session.id()).or_insert_with(|| {
        inserted = true;
        session
    });
    inserted
}
