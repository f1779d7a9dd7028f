//! The booking state machine.
//!
//! `advance` consumes the stored progress and one user answer, and returns
//! the updated progress (or a completed booking) plus the reply to show.
//! Failures never escape as errors: invalid input, slot collisions, and
//! persistence trouble all degrade to user-visible messages while keeping
//! the collected data intact.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::config::BookingPolicy;

use super::store::{BookingStore, BookingStoreError};
use super::validate::{validate_date, validate_email, validate_name, validate_time};
use super::{BookingProgress, BookingRecord, BookingStep};

// ============================================================================
// Outcome
// ============================================================================

/// Result of advancing the booking dialogue by one turn.
#[derive(Debug)]
pub enum Advance {
    /// The dialogue continues; persist `progress` and show `reply`.
    InProgress {
        progress: BookingProgress,
        reply: String,
    },
    /// The booking was persisted; clear progress and show `reply`.
    Complete {
        record: BookingRecord,
        confirmation_id: String,
        reply: String,
    },
}

// ============================================================================
// Engine
// ============================================================================

pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    policy: BookingPolicy,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn BookingStore>, policy: BookingPolicy) -> Self {
        Self { store, policy }
    }

    /// Opening message when a booking dialogue starts.
    #[must_use]
    pub fn start_prompt(&self) -> String {
        "I'll help you schedule an interview. Let's get started!\n\n\
         Please provide your **full name**."
            .to_string()
    }

    /// Advance the dialogue with one user answer.
    pub async fn advance(&self, mut progress: BookingProgress, input: &str) -> Advance {
        let input = input.trim();

        // A finished booking waiting on persistence retries the save alone;
        // collected data is never re-requested.
        if progress.step == BookingStep::Confirmed {
            return self.finalize(progress).await;
        }

        // Past the retry bound, the user may restart from scratch. Cancel is
        // the orchestrator's job (it owns intent), so only restart is
        // handled here.
        if progress.attempts >= self.policy.max_attempts && wants_restart(input) {
            return Advance::InProgress {
                progress: BookingProgress::start(),
                reply: format!("No problem, let's start over.\n\n{}", self.start_prompt()),
            };
        }

        match progress.step {
            BookingStep::Name => match validate_name(input) {
                Ok(name) => {
                    let reply = format!(
                        "Thank you, {name}! Now, please provide your **email address**."
                    );
                    progress.collected.name = Some(name);
                    self.accept(progress, reply)
                }
                Err(msg) => self.reject(progress, msg),
            },
            BookingStep::Email => match validate_email(input) {
                Ok(email) => {
                    progress.collected.email = Some(email);
                    self.accept(
                        progress,
                        "Great! Now, please provide your preferred **date** for the \
                         interview.\nFormat: YYYY-MM-DD (e.g., 2025-11-20)"
                            .to_string(),
                    )
                }
                Err(msg) => self.reject(progress, msg),
            },
            BookingStep::Date => {
                match validate_date(input, &self.policy, Utc::now().date_naive()) {
                    Ok(date) => {
                        progress.collected.date = Some(date);
                        self.accept(
                            progress,
                            "Perfect! Finally, please provide your preferred **time**.\n\
                             Format: HH:MM in 24-hour format (e.g., 14:30)"
                                .to_string(),
                        )
                    }
                    Err(msg) => self.reject(progress, msg),
                }
            }
            BookingStep::Time => self.advance_time(progress, input).await,
            BookingStep::Confirmed => unreachable!("handled above"),
        }
    }

    /// Time validation plus the slot-collision check, then finalization.
    async fn advance_time(&self, mut progress: BookingProgress, input: &str) -> Advance {
        let time = match validate_time(input, &self.policy) {
            Ok(time) => time,
            Err(msg) => return self.reject(progress, msg),
        };

        let Some(date) = progress.collected.date else {
            // Collected fields out of step with the state; only reachable
            // through a corrupted store entry. Start over rather than guess.
            warn!("booking progress at time step with no collected date, restarting");
            return Advance::InProgress {
                progress: BookingProgress::start(),
                reply: format!(
                    "Something went wrong with your booking, sorry about that.\n\n{}",
                    self.start_prompt()
                ),
            };
        };

        match self.store.is_slot_taken(date, time).await {
            Ok(true) => self.reject(
                progress,
                format!(
                    "Sorry, {date} at {} is already taken. Please pick a different **time**.",
                    time.format("%H:%M")
                ),
            ),
            Ok(false) => {
                progress.collected.time = Some(time);
                progress.step = BookingStep::Confirmed;
                progress.attempts = 0;
                self.finalize(progress).await
            }
            Err(e) => {
                // Not the user's fault; leave the attempt counter alone.
                warn!(error = %e, "slot availability check failed");
                Advance::InProgress {
                    progress,
                    reply: "I couldn't check availability for that slot just now. \
                            Please send the time again in a moment."
                        .to_string(),
                }
            }
        }
    }

    /// Persist the finished booking. A slot collision surfaced by the save
    /// sends the dialogue back to the time step; any other failure parks the
    /// progress at `confirmed` so the next turn retries the save alone.
    async fn finalize(&self, mut progress: BookingProgress) -> Advance {
        let fields = &progress.collected;
        let (Some(name), Some(email), Some(date), Some(time)) = (
            fields.name.clone(),
            fields.email.clone(),
            fields.date,
            fields.time,
        ) else {
            warn!(step = %progress.step, "booking progress missing collected fields, restarting");
            return Advance::InProgress {
                progress: BookingProgress::start(),
                reply: format!(
                    "Something went wrong with your booking, sorry about that.\n\n{}",
                    self.start_prompt()
                ),
            };
        };

        let record = BookingRecord {
            name,
            email,
            date,
            time,
        };

        match self.store.save(&record).await {
            Ok(confirmation_id) => {
                let reply = format!(
                    "**Booking confirmed!**\n\n\
                     **Confirmation ID:** {confirmation_id}\n\
                     **Name:** {}\n\
                     **Email:** {}\n\
                     **Date:** {}\n\
                     **Time:** {}\n\n\
                     You will receive a confirmation email shortly. \
                     Looking forward to meeting you!",
                    record.name,
                    record.email,
                    record.date,
                    record.time.format("%H:%M"),
                );
                Advance::Complete {
                    record,
                    confirmation_id,
                    reply,
                }
            }
            // The availability check is advisory; the save is the authority
            // on slot uniqueness. Losing the race means picking a new time.
            Err(BookingStoreError::SlotTaken { date, time }) => {
                warn!(%date, %time, "slot claimed before save completed");
                progress.step = BookingStep::Time;
                progress.collected.time = None;
                self.reject(
                    progress,
                    format!(
                        "Sorry, {date} at {} is already taken. Please pick a different **time**.",
                        time.format("%H:%M")
                    ),
                )
            }
            Err(e) => {
                warn!(error = %e, "failed to persist booking");
                Advance::InProgress {
                    progress,
                    reply: "Your details are all set, but I couldn't save the booking \
                            just now. Send any message and I'll try again - you won't \
                            need to repeat anything."
                        .to_string(),
                }
            }
        }
    }

    /// Valid answer: store happened at the caller, move to the next step.
    fn accept(&self, mut progress: BookingProgress, reply: String) -> Advance {
        progress.step = progress.step.next();
        progress.attempts = 0;
        Advance::InProgress { progress, reply }
    }

    /// Invalid answer: stay put, bump the counter, offer a way out once the
    /// bound is hit.
    fn reject(&self, mut progress: BookingProgress, mut reply: String) -> Advance {
        progress.attempts += 1;
        if progress.attempts >= self.policy.max_attempts {
            reply.push_str(
                "\n\nHaving trouble? Say **restart** to begin the booking again, \
                 or **cancel** to stop.",
            );
        }
        Advance::InProgress { progress, reply }
    }
}

fn wants_restart(input: &str) -> bool {
    let lower = input.to_lowercase();
    lower.contains("restart") || lower.contains("start over")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

    use super::super::store::{BookingStoreError, MemoryBookingStore};
    use super::*;

    fn engine() -> (BookingEngine, Arc<MemoryBookingStore>) {
        let store = Arc::new(MemoryBookingStore::new());
        (
            BookingEngine::new(store.clone(), BookingPolicy::default()),
            store,
        )
    }

    /// A weekday within the default horizon, relative to now.
    fn bookable_date() -> NaiveDate {
        let mut date = Utc::now().date_naive() + Duration::days(7);
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        date
    }

    async fn in_progress(engine: &BookingEngine, progress: BookingProgress, input: &str) -> (BookingProgress, String) {
        match engine.advance(progress, input).await {
            Advance::InProgress { progress, reply } => (progress, reply),
            other => panic!("expected InProgress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_confirmed() {
        let (engine, store) = engine();
        let date = bookable_date();

        let (p, reply) = in_progress(&engine, BookingProgress::start(), "Alice").await;
        assert_eq!(p.step, BookingStep::Email);
        assert!(reply.contains("Alice"));

        let (p, _) = in_progress(&engine, p, "alice@example.com").await;
        assert_eq!(p.step, BookingStep::Date);

        let (p, reply) = in_progress(&engine, p, &date.to_string()).await;
        assert_eq!(p.step, BookingStep::Time);
        assert!(reply.contains("HH:MM"));

        match engine.advance(p, "09:00").await {
            Advance::Complete {
                record,
                confirmation_id,
                reply,
            } => {
                assert_eq!(record.name, "Alice");
                assert_eq!(record.email, "alice@example.com");
                assert_eq!(record.date, date);
                assert!(reply.contains(&confirmation_id));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn invalid_email_stays_and_counts() {
        let (engine, _) = engine();
        let mut progress = BookingProgress::start();
        progress.step = BookingStep::Email;
        progress.collected.name = Some("Alice".to_string());

        let (p, reply) = in_progress(&engine, progress, "not-an-email").await;
        assert_eq!(p.step, BookingStep::Email);
        assert_eq!(p.attempts, 1);
        assert!(reply.contains("email"));

        // Same invalid input again: collected unchanged, counter up again.
        let (p, _) = in_progress(&engine, p, "not-an-email").await;
        assert_eq!(p.attempts, 2);
        assert_eq!(p.collected.name.as_deref(), Some("Alice"));
        assert!(p.collected.email.is_none());
    }

    #[tokio::test]
    async fn taken_slot_is_rejected() {
        let (engine, store) = engine();
        let date = bookable_date();
        let time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        store.reserve_slot(date, time).await;

        let mut progress = BookingProgress::start();
        progress.step = BookingStep::Time;
        progress.collected.name = Some("Alice".to_string());
        progress.collected.email = Some("alice@example.com".to_string());
        progress.collected.date = Some(date);

        let (p, reply) = in_progress(&engine, progress, "14:00").await;
        assert_eq!(p.step, BookingStep::Time);
        assert_eq!(p.attempts, 1);
        assert!(reply.contains("already taken"));
    }

    #[tokio::test]
    async fn max_attempts_offers_restart_then_restarts() {
        let (engine, _) = engine();
        let mut progress = BookingProgress::start();

        let mut reply = String::new();
        for _ in 0..3 {
            let (p, r) = in_progress(&engine, progress, "!").await;
            progress = p;
            reply = r;
        }
        assert_eq!(progress.attempts, 3);
        assert!(reply.contains("restart"));

        let (p, reply) = in_progress(&engine, progress, "restart").await;
        assert_eq!(p.step, BookingStep::Name);
        assert_eq!(p.attempts, 0);
        assert!(reply.contains("full name"));
    }

    #[tokio::test]
    async fn restart_keyword_ignored_below_the_bound() {
        let (engine, _) = engine();
        let mut progress = BookingProgress::start();
        progress.step = BookingStep::Email;
        progress.collected.name = Some("Restart Smith".to_string());

        // "restart" is just an invalid email here, not a reset.
        let (p, _) = in_progress(&engine, progress, "restart").await;
        assert_eq!(p.step, BookingStep::Email);
        assert_eq!(p.collected.name.as_deref(), Some("Restart Smith"));
    }

    // ------------------------------------------------------------------
    // Save-time collision
    // ------------------------------------------------------------------

    /// Availability that always reads free, the way a stale external lookup
    /// does when two dialogues race for the same slot.
    struct StaleCheckStore {
        inner: MemoryBookingStore,
    }

    #[async_trait]
    impl BookingStore for StaleCheckStore {
        async fn is_slot_taken(
            &self,
            _date: NaiveDate,
            _time: NaiveTime,
        ) -> Result<bool, BookingStoreError> {
            Ok(false)
        }

        async fn save(&self, record: &BookingRecord) -> Result<String, BookingStoreError> {
            self.inner.save(record).await
        }
    }

    fn progress_at_time(date: NaiveDate) -> BookingProgress {
        let mut progress = BookingProgress::start();
        progress.step = BookingStep::Time;
        progress.collected.name = Some("Alice".to_string());
        progress.collected.email = Some("alice@example.com".to_string());
        progress.collected.date = Some(date);
        progress
    }

    #[tokio::test]
    async fn save_collision_returns_to_time_step() {
        let store = Arc::new(StaleCheckStore {
            inner: MemoryBookingStore::new(),
        });
        let engine = BookingEngine::new(store.clone(), BookingPolicy::default());
        let date = bookable_date();

        match engine.advance(progress_at_time(date), "10:00").await {
            Advance::Complete { .. } => {}
            other => panic!("expected Complete, got {other:?}"),
        }

        // Second dialogue raced past the availability check; the save still
        // refuses the slot and the user is asked for a new time.
        let (p, reply) = in_progress(&engine, progress_at_time(date), "10:00").await;
        assert_eq!(p.step, BookingStep::Time);
        assert!(p.collected.time.is_none());
        assert_eq!(p.attempts, 1);
        assert!(reply.contains("already taken"));
        assert_eq!(store.inner.len().await, 1);
    }

    // ------------------------------------------------------------------
    // Persistence failure
    // ------------------------------------------------------------------

    struct FlakyStore {
        fail_next: AtomicBool,
        inner: MemoryBookingStore,
    }

    #[async_trait]
    impl BookingStore for FlakyStore {
        async fn is_slot_taken(
            &self,
            date: NaiveDate,
            time: NaiveTime,
        ) -> Result<bool, BookingStoreError> {
            self.inner.is_slot_taken(date, time).await
        }

        async fn save(&self, record: &BookingRecord) -> Result<String, BookingStoreError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(BookingStoreError::Backend("connection refused".into()));
            }
            self.inner.save(record).await
        }
    }

    #[tokio::test]
    async fn persistence_failure_holds_at_confirmed_then_retries() {
        let store = Arc::new(FlakyStore {
            fail_next: AtomicBool::new(true),
            inner: MemoryBookingStore::new(),
        });
        let engine = BookingEngine::new(store.clone(), BookingPolicy::default());

        let mut progress = BookingProgress::start();
        progress.step = BookingStep::Time;
        progress.collected.name = Some("Alice".to_string());
        progress.collected.email = Some("alice@example.com".to_string());
        progress.collected.date = Some(bookable_date());

        // First save fails: no regression, step parks at confirmed.
        let (p, reply) = in_progress(&engine, progress, "09:30").await;
        assert_eq!(p.step, BookingStep::Confirmed);
        assert_eq!(p.collected.time, NaiveTime::from_hms_opt(9, 30, 0));
        assert!(reply.contains("try again"));

        // Any next message retries the save alone.
        match engine.advance(p, "ok").await {
            Advance::Complete { record, .. } => {
                assert_eq!(record.name, "Alice");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(store.inner.len().await, 1);
    }
}
