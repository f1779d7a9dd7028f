//! Per-session locking.
//!
//! Turns for the same session must be processed in arrival order; turns for
//! different sessions are independent. `SessionLocks` hands out one async
//! mutex per session id so the orchestrator can serialize same-session turns
//! without a global lock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Interval between cleanup runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Max idle age before a lock entry is considered stale.
pub const MAX_IDLE_AGE: Duration = Duration::from_secs(7200);

type LockStorage = DashMap<String, (Arc<Mutex<()>>, Instant)>;

/// Per-session async mutex with stale entry cleanup.
///
/// Different sessions lock concurrently; operations on the same session id
/// are serialized. Last-access times are tracked so entries for long-idle
/// sessions can be swept periodically.
#[derive(Clone)]
pub struct SessionLocks {
    locks: Arc<LockStorage>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Get or create the lock for a session id.
    pub fn get(&self, session_id: &str) -> Arc<Mutex<()>> {
        let now = Instant::now();
        self.locks
            .entry(session_id.to_string())
            .and_modify(|(_, last_access)| *last_access = now)
            .or_insert_with(|| (Arc::new(Mutex::new(())), now))
            .0
            .clone()
    }

    /// Remove entries not accessed within `max_age`.
    ///
    /// An entry is only removed when nothing else holds a reference to its
    /// lock (strong_count == 1), so a session mid-turn is never evicted.
    /// Returns the number of entries removed.
    pub fn cleanup_stale(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<_> = self
            .locks
            .iter()
            .filter(|entry| {
                let (lock, last_access) = entry.value();
                Arc::strong_count(lock) == 1 && now.duration_since(*last_access) > max_age
            })
            .map(|entry| entry.key().clone())
            .collect();

        let count = stale.len();
        for key in stale {
            self.locks.remove(&key);
        }
        count
    }

    /// Spawn a background task that periodically sweeps stale entries.
    ///
    /// Runs until the runtime shuts down.
    pub fn spawn_cleanup_task(self) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                ticker.tick().await;
                let removed = self.cleanup_stale(MAX_IDLE_AGE);
                if removed > 0 {
                    debug!(removed, remaining = self.len(), "Swept stale session locks");
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}
