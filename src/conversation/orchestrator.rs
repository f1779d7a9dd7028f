//! Top-level turn coordinator.
//!
//! `handle_turn` is the single entry point for inbound messages. It holds
//! the per-session lock for the whole turn, so turns on one session are
//! processed in arrival order, and it writes the session back exactly once,
//! so an aborted request leaves the stored session at the previous turn
//! boundary.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::booking::{Advance, BookingEngine, BookingProgress, BookingRecord};
use crate::retrieval::Retriever;
use crate::session::{Result as SessionResult, Session, SessionStore, Turn, TurnRole};
use crate::sync::SessionLocks;

use super::answer::AnswerGenerator;
use super::intent::{Intent, IntentClassifier};

const APOLOGY_REPLY: &str = "I'm sorry, I'm having trouble answering that right now. \
    Please try again in a moment.";

const CANCEL_REPLY: &str = "No problem - I've cancelled the booking. \
    Feel free to ask me anything about the documents.";

const CLARIFY_REPLY: &str = "I'm not sure what you'd like to do. You can ask a question \
    about the documents, or say \"book an interview\" to schedule one.";

// ============================================================================
// Settings & Outcome
// ============================================================================

/// Tuning knobs the orchestrator needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Session TTL refreshed on every write-back.
    pub session_ttl: Duration,
    /// Recent turns handed to the answer generator.
    pub history_window: usize,
    /// Passages requested from the retriever.
    pub top_k: usize,
    /// Deadline for one retrieval call.
    pub retrieval_timeout: Duration,
}

/// What one turn produced, for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    /// A booking dialogue is in flight after this turn.
    pub booking_active: bool,
    /// This turn confirmed and persisted a booking.
    pub booking_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<ConfirmedBooking>,
}

/// A booking confirmed during this turn.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedBooking {
    pub confirmation_id: String,
    #[serde(flatten)]
    pub record: BookingRecord,
}

impl TurnOutcome {
    fn plain(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            booking_active: false,
            booking_complete: false,
            booking: None,
        }
    }

    fn booking_active(reply: impl Into<String>) -> Self {
        Self {
            booking_active: true,
            ..Self::plain(reply)
        }
    }

    fn booking_complete(reply: String, record: BookingRecord, confirmation_id: String) -> Self {
        Self {
            reply,
            booking_active: false,
            booking_complete: true,
            booking: Some(ConfirmedBooking {
                confirmation_id,
                record,
            }),
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    sessions: Arc<dyn SessionStore>,
    retriever: Option<Arc<dyn Retriever>>,
    classifier: IntentClassifier,
    generator: AnswerGenerator,
    booking: BookingEngine,
    locks: SessionLocks,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        retriever: Option<Arc<dyn Retriever>>,
        classifier: IntentClassifier,
        generator: AnswerGenerator,
        booking: BookingEngine,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            sessions,
            retriever,
            classifier,
            generator,
            booking,
            locks: SessionLocks::new(),
            settings,
        }
    }

    /// Spawn the background sweep for idle session locks.
    pub fn spawn_lock_cleanup(&self) {
        self.locks.clone().spawn_cleanup_task();
    }

    /// Process one inbound message and produce the reply.
    ///
    /// Every call appends exactly one user turn and one assistant turn to
    /// the session, whatever branch runs, so history growth is always two
    /// turns per call.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
    ) -> SessionResult<TurnOutcome> {
        let lock = self.locks.get(session_id);
        let _guard = lock.lock().await;

        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .unwrap_or_else(|| Session::new(session_id));

        let intent = self
            .classifier
            .classify(message, session.booking.is_some())
            .await;
        debug!(session_id, ?intent, "classified turn");

        let outcome = match intent {
            Intent::DocumentQuery => self.answer_document_query(&session, message).await,
            Intent::BookingStart => {
                session.booking = Some(BookingProgress::start());
                TurnOutcome::booking_active(self.booking.start_prompt())
            }
            Intent::BookingContinue => self.continue_booking(&mut session, message).await,
            Intent::BookingCancel => {
                session.booking = None;
                TurnOutcome::plain(CANCEL_REPLY)
            }
            Intent::Unclear if session.booking.is_some() => {
                TurnOutcome::booking_active(CLARIFY_REPLY)
            }
            Intent::Unclear => TurnOutcome::plain(CLARIFY_REPLY),
        };

        session.push_turn(TurnRole::User, message);
        session.push_turn(TurnRole::Assistant, &outcome.reply);
        self.sessions.put(&session, self.settings.session_ttl).await?;

        Ok(outcome)
    }

    /// Turn history for a session, most recent last. `None` when the session
    /// is absent or expired.
    pub async fn history(&self, session_id: &str) -> SessionResult<Option<Vec<Turn>>> {
        Ok(self.sessions.get(session_id).await?.map(|s| s.turns))
    }

    /// Drop a session entirely: history and any booking progress.
    pub async fn clear(&self, session_id: &str) -> SessionResult<()> {
        let lock = self.locks.get(session_id);
        let _guard = lock.lock().await;
        self.sessions.delete(session_id).await
    }

    // ------------------------------------------------------------------
    // Branches
    // ------------------------------------------------------------------

    /// The RAG path. Retrieval or generation trouble degrades to an apology
    /// reply; the turn is still recorded by the caller.
    async fn answer_document_query(&self, session: &Session, message: &str) -> TurnOutcome {
        let passages = match &self.retriever {
            Some(retriever) => {
                let search = retriever.search(message, self.settings.top_k);
                match timeout(self.settings.retrieval_timeout, search).await {
                    Ok(Ok(passages)) => passages,
                    Ok(Err(e)) => {
                        warn!(error = %e, "retrieval failed");
                        return TurnOutcome::plain(APOLOGY_REPLY);
                    }
                    Err(_) => {
                        warn!(timeout = ?self.settings.retrieval_timeout, "retrieval timed out");
                        return TurnOutcome::plain(APOLOGY_REPLY);
                    }
                }
            }
            None => Vec::new(),
        };

        let history = session.recent_turns(self.settings.history_window);
        match self.generator.generate(message, &passages, history).await {
            Ok(answer) => TurnOutcome::plain(answer),
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                TurnOutcome::plain(APOLOGY_REPLY)
            }
        }
    }

    async fn continue_booking(&self, session: &mut Session, message: &str) -> TurnOutcome {
        let Some(progress) = session.booking.take() else {
            // Classification only yields continue for an active booking;
            // treat a missing one as a fresh start.
            session.booking = Some(BookingProgress::start());
            return TurnOutcome::booking_active(self.booking.start_prompt());
        };

        match self.booking.advance(progress, message).await {
            Advance::InProgress { progress, reply } => {
                session.booking = Some(progress);
                TurnOutcome::booking_active(reply)
            }
            Advance::Complete {
                record,
                confirmation_id,
                reply,
            } => TurnOutcome::booking_complete(reply, record, confirmation_id),
        }
    }
}
