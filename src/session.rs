//! Session registry for the HTTP shell.
//!
//! A session is created when a client connects (`POST /sessions`) and
//! destroyed when it leaves (`DELETE /sessions/{id}`). Each transcript sits
//! behind its own async mutex: one question per session runs at a time,
//! while different sessions proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use ragify_core::session::Transcript;

pub type SessionHandle = Arc<Mutex<Transcript>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, transcript: Transcript) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(transcript));
        self.sessions.write().await.insert(id, handle.clone());
        tracing::debug!(session = %id, "session created");
        (id, handle)
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Returns whether a session was removed.
    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = %id, "session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_remove() {
        let registry = SessionRegistry::new();
        let (id, handle) = registry.create(Transcript::new("welcome")).await;
        assert_eq!(registry.len().await, 1);

        handle.lock().await.push_user("question");
        let fetched = registry.get(&id).await.unwrap();
        assert_eq!(fetched.lock().await.len(), 2);

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.get(&id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        let (a, _) = registry.create(Transcript::new("welcome")).await;
        let (b, _) = registry.create(Transcript::new("welcome")).await;
        assert_ne!(a, b);

        registry.get(&a).await.unwrap().lock().await.push_user("only in a");
        assert_eq!(registry.get(&b).await.unwrap().lock().await.len(), 1);
    }
}
