//! The conversation orchestration engine.
//!
//! One inbound message becomes exactly one turn: the orchestrator loads the
//! session, classifies the message, routes it to document Q&A or the booking
//! dialogue, and writes the session back once with both turns appended.

mod answer;
mod intent;
mod orchestrator;

pub use answer::AnswerGenerator;
pub use intent::{Intent, IntentClassifier};
pub use orchestrator::{ConfirmedBooking, Orchestrator, OrchestratorSettings, TurnOutcome};
