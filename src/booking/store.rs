//! Booking persistence seam.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tokio::sync::RwLock;
use ulid::Ulid;

use super::BookingRecord;

/// ID prefix for confirmed bookings.
pub const CONFIRMATION_ID_PREFIX: &str = "bk_";

/// Errors from the booking backend.
#[derive(Debug, Error)]
pub enum BookingStoreError {
    /// Another confirmed booking claimed the slot before this save landed.
    #[error("slot {date} at {time} is already booked")]
    SlotTaken { date: NaiveDate, time: NaiveTime },

    #[error("booking store error: {0}")]
    Backend(String),
}

/// Storage for confirmed bookings plus the slot-collision lookup.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Whether a confirmed booking already holds this date/time slot.
    async fn is_slot_taken(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, BookingStoreError>;

    /// Persist a finalized booking, returning its confirmation id.
    ///
    /// `is_slot_taken` is advisory; the save itself must enforce slot
    /// uniqueness and fail with [`BookingStoreError::SlotTaken`] when the
    /// slot was claimed in between.
    async fn save(&self, record: &BookingRecord) -> Result<String, BookingStoreError>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// In-memory booking store. Default backend when no external database is
/// configured; also the workhorse for tests.
#[derive(Clone, Default)]
pub struct MemoryBookingStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    slots: HashSet<(NaiveDate, NaiveTime)>,
    records: Vec<BookingRecord>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-mark a slot as taken. Test and seeding helper.
    pub async fn reserve_slot(&self, date: NaiveDate, time: NaiveTime) {
        self.inner.write().await.slots.insert((date, time));
    }

    /// Number of persisted bookings.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn is_slot_taken(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, BookingStoreError> {
        Ok(self.inner.read().await.slots.contains(&(date, time)))
    }

    async fn save(&self, record: &BookingRecord) -> Result<String, BookingStoreError> {
        let mut inner = self.inner.write().await;
        // The insert doubles as the uniqueness check under the write lock.
        if !inner.slots.insert((record.date, record.time)) {
            return Err(BookingStoreError::SlotTaken {
                date: record.date,
                time: record.time,
            });
        }
        inner.records.push(record.clone());
        Ok(format!("{}{}", CONFIRMATION_ID_PREFIX, Ulid::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> BookingRecord {
        BookingRecord {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn fresh_slot_is_free() {
        let store = MemoryBookingStore::new();
        let r = record();
        assert!(!store.is_slot_taken(r.date, r.time).await.unwrap());
    }

    #[tokio::test]
    async fn save_takes_the_slot() {
        let store = MemoryBookingStore::new();
        let r = record();

        let id = store.save(&r).await.unwrap();
        assert!(id.starts_with(CONFIRMATION_ID_PREFIX));
        assert!(store.is_slot_taken(r.date, r.time).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_save_for_occupied_slot_fails() {
        let store = MemoryBookingStore::new();
        let r = record();

        store.save(&r).await.unwrap();
        let err = store.save(&r).await.unwrap_err();
        assert!(matches!(err, BookingStoreError::SlotTaken { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_saves_admit_exactly_one() {
        let store = Arc::new(MemoryBookingStore::new());
        let r = record();

        let first = {
            let store = store.clone();
            let r = r.clone();
            async move { store.save(&r).await }
        };
        let second = {
            let store = store.clone();
            let r = r.clone();
            async move { store.save(&r).await }
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn reserve_slot_marks_collision() {
        let store = MemoryBookingStore::new();
        let r = record();
        store.reserve_slot(r.date, r.time).await;
        assert!(store.is_slot_taken(r.date, r.time).await.unwrap());
    }
}
