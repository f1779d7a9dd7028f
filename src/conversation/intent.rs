//! Hybrid intent classification.
//!
//! Three tiers, tried in order and short-circuiting: deterministic keyword
//! checks, the active-booking context rule, and finally one generative
//! classifier call. The model is only consulted when the cheap tiers have
//! nothing to say, which bounds latency and cost per turn.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::llm::{ChatRequest, LlmProvider, Message};

/// The classified purpose of a user message. Recomputed every turn, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    DocumentQuery,
    BookingStart,
    BookingContinue,
    BookingCancel,
    Unclear,
}

/// Phrases that open a booking dialogue when none is active.
const BOOKING_KEYWORDS: &[&str] = &[
    "book",
    "booking",
    "schedule",
    "interview",
    "appointment",
    "meeting",
    "slot",
];

/// Phrases that cancel an active booking dialogue.
const CANCEL_KEYWORDS: &[&str] = &["cancel", "stop", "nevermind", "never mind"];

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an intent classifier for a document Q&A \
    assistant that can also schedule interviews. Analyze the user's message and respond \
    with ONLY one word: BOOKING if they want to book or schedule an interview or \
    appointment, UNCLEAR if the message has no discernible request, or OTHER for \
    anything else.";

pub struct IntentClassifier {
    provider: Arc<dyn LlmProvider>,
    model: String,
    call_timeout: Duration,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String, call_timeout: Duration) -> Self {
        Self {
            provider,
            model,
            call_timeout,
        }
    }

    /// Classify one user message.
    ///
    /// Never fails: classifier trouble degrades to `DocumentQuery` so the
    /// user is never blocked on classification uncertainty.
    pub async fn classify(&self, message: &str, has_active_booking: bool) -> Intent {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Intent::Unclear;
        }
        let lower = trimmed.to_lowercase();

        if has_active_booking {
            // An active booking owns the turn unless the user backs out.
            if CANCEL_KEYWORDS.iter().any(|k| contains_phrase(&lower, k)) {
                return Intent::BookingCancel;
            }
            return Intent::BookingContinue;
        }

        if BOOKING_KEYWORDS.iter().any(|k| contains_phrase(&lower, k)) {
            return Intent::BookingStart;
        }

        self.generative_fallback(trimmed).await
    }

    async fn generative_fallback(&self, message: &str) -> Intent {
        let request = ChatRequest::new(
            &self.model,
            vec![
                Message::system(CLASSIFIER_SYSTEM_PROMPT),
                Message::user(format!("User message: \"{message}\"")),
            ],
            Some(0.0),
            Some(5),
        );

        let response = match timeout(self.call_timeout, self.provider.chat(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "intent classification degraded, defaulting to document query");
                return Intent::DocumentQuery;
            }
            Err(_) => {
                warn!(
                    timeout = ?self.call_timeout,
                    "intent classification timed out, defaulting to document query"
                );
                return Intent::DocumentQuery;
            }
        };

        let label = response.first_content().unwrap_or_default().to_uppercase();
        if label.contains("BOOKING") {
            Intent::BookingStart
        } else if label.contains("UNCLEAR") {
            Intent::Unclear
        } else if label.contains("OTHER") {
            Intent::DocumentQuery
        } else {
            warn!(%label, "unparseable classifier label, defaulting to document query");
            Intent::DocumentQuery
        }
    }
}

/// Whole-word (or whole-phrase) containment, so "book" does not fire on
/// "notebook".
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.contains(' ') {
        return haystack.contains(phrase);
    }
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == phrase)
}
