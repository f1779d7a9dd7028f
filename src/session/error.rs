//! Session error types.

use thiserror::Error;

/// Errors that can occur during session store operations.
///
/// The in-memory store is infallible; durable `SessionStore` backends map
/// their connection and payload failures into `Store`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing store failed.
    #[error("session store error: {0}")]
    Store(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
