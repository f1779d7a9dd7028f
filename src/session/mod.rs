//! Conversation sessions and the session store seam.
//!
//! A session is the unit of conversational state: the ordered turn history
//! plus any in-flight booking progress. Sessions are only ever mutated by
//! the orchestrator, which writes them back once per turn.

mod error;
mod memory;

pub use error::{Result, SessionError};
pub use memory::MemorySessionStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::BookingProgress;

// ============================================================================
// Session
// ============================================================================

/// A conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    /// In-flight booking dialogue, if any. At most one per session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingProgress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session for an unseen id.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            booking: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn and bump the updated timestamp.
    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        let now = Utc::now();
        self.turns.push(Turn {
            role,
            content: content.into(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// The most recent `window` turns, oldest first.
    #[must_use]
    pub fn recent_turns(&self, window: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }
}

/// One message exchange unit in session history. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

// ============================================================================
// SessionStore Trait
// ============================================================================

/// Keyed storage for sessions with a time-to-live.
///
/// The TTL is refreshed on every `put`; expired sessions behave as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id. Returns `Ok(None)` when absent or expired.
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Write a session back, refreshing its TTL.
    async fn put(&self, session: &Session, ttl: Duration) -> Result<()>;

    /// Drop a session and its booking state entirely.
    async fn delete(&self, session_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_turn_appends_and_touches() {
        let mut session = Session::new("s1");
        let before = session.updated_at;
        session.push_turn(TurnRole::User, "hello");
        session.push_turn(TurnRole::Assistant, "hi");

        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].role, TurnRole::User);
        assert_eq!(session.turns[1].role, TurnRole::Assistant);
        assert!(session.updated_at >= before);
    }

    #[test]
    fn recent_turns_returns_tail() {
        let mut session = Session::new("s1");
        for i in 0..10 {
            session.push_turn(TurnRole::User, format!("msg {i}"));
        }

        let recent = session.recent_turns(4);
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].content, "msg 6");
        assert_eq!(recent[3].content, "msg 9");
    }

    #[test]
    fn recent_turns_handles_short_history() {
        let mut session = Session::new("s1");
        session.push_turn(TurnRole::User, "only one");
        assert_eq!(session.recent_turns(6).len(), 1);
    }

    #[test]
    fn session_roundtrips_through_json() {
        let mut session = Session::new("s1");
        session.push_turn(TurnRole::User, "hello");

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        // no booking in flight, field elided
        assert!(!json.contains("booking"));

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "s1");
        assert!(back.booking.is_none());
    }
}
