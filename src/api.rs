//! Shared API types used by the server handlers.
//!
//! These types define the HTTP contract; keeping them in one place prevents
//! silent drift between handlers and any client code.

use serde::{Deserialize, Serialize};

use crate::conversation::ConfirmedBooking;

// ============================================================================
// Chat
// ============================================================================

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub session_id: String,
    pub message: String,
}

/// Response body for `POST /api/v1/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnResponse {
    pub session_id: String,
    pub reply: String,
    pub booking_active: bool,
    pub booking_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<ConfirmedBooking>,
}

// ============================================================================
// History & Session
// ============================================================================

/// One turn in a history response.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

/// Response body for `GET /api/v1/chat/{session_id}/history`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turn_count: usize,
    pub turns: Vec<TurnResponse>,
}

/// Response body for `DELETE /api/v1/chat/{session_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ClearSessionResponse {
    pub session_id: String,
    pub cleared: bool,
}
