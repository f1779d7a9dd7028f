//! Appointment booking: progressive field collection with validation.
//!
//! The dialogue walks a fixed field order (`name → email → date → time`),
//! validating each answer before it is stored. The state machine itself is
//! in [`engine`]; the collision check and final persistence go through the
//! [`BookingStore`] seam.

mod engine;
mod store;
mod validate;

pub use engine::{Advance, BookingEngine};
pub use store::{BookingStore, BookingStoreError, CONFIRMATION_ID_PREFIX, MemoryBookingStore};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Steps
// ============================================================================

/// Steps of the booking dialogue, in collection order.
///
/// `Confirmed` is only held while a finished booking is waiting on a
/// persistence retry; a successfully saved booking clears the progress
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    Name,
    Email,
    Date,
    Time,
    Confirmed,
}

impl BookingStep {
    /// The step that follows this one in the fixed order.
    #[must_use]
    pub fn next(self) -> BookingStep {
        match self {
            BookingStep::Name => BookingStep::Email,
            BookingStep::Email => BookingStep::Date,
            BookingStep::Date => BookingStep::Time,
            BookingStep::Time | BookingStep::Confirmed => BookingStep::Confirmed,
        }
    }
}

impl std::fmt::Display for BookingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStep::Name => write!(f, "name"),
            BookingStep::Email => write!(f, "email"),
            BookingStep::Date => write!(f, "date"),
            BookingStep::Time => write!(f, "time"),
            BookingStep::Confirmed => write!(f, "confirmed"),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// In-flight state of the booking dialogue, persisted inside the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingProgress {
    pub step: BookingStep,
    #[serde(default)]
    pub collected: CollectedFields,
    /// Invalid answers given for the current step.
    #[serde(default)]
    pub attempts: u32,
}

impl BookingProgress {
    /// Fresh progress at the first step.
    #[must_use]
    pub fn start() -> Self {
        Self {
            step: BookingStep::Name,
            collected: CollectedFields::default(),
            attempts: 0,
        }
    }
}

/// Validated field values collected so far.
///
/// A value is only ever written here after passing its field validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
}

// ============================================================================
// Record
// ============================================================================

/// A fully validated booking, ready for persistence. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub name: String,
    pub email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}
