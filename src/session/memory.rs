//! In-memory session store.
//!
//! Expiry is lazy: entries past their deadline are treated as absent on read
//! and dropped on the next write that touches them. Good enough for a single
//! process; a durable store implements the same trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::error::Result;
use super::{Session, SessionStore};

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

struct Entry {
    session: Session,
    expires_at: Instant,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(session_id)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.session.clone()))
    }

    async fn put(&self, session: &Session, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        // Opportunistic sweep keeps the map from accumulating dead sessions.
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnRole;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn get_absent_returns_none() {
        let store = MemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemorySessionStore::new();
        let mut session = Session::new("s1");
        session.push_turn(TurnRole::User, "hello");
        store.put(&session, TTL).await.unwrap();

        let loaded = store.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.turns.len(), 1);
        assert_eq!(loaded.turns[0].content, "hello");
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = MemorySessionStore::new();
        store.put(&Session::new("s1"), TTL).await.unwrap();
        store.delete("s1").await.unwrap();
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_reads_as_absent() {
        let store = MemorySessionStore::new();
        store
            .put(&Session::new("s1"), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_refreshes_ttl() {
        let store = MemorySessionStore::new();
        let session = Session::new("s1");
        store.put(&session, Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        store.put(&session, Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get("s1").await.unwrap().is_some());
    }
}
