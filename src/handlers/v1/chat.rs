//! Chat HTTP handlers.

use axum::Json;
use axum::extract::{Path as PathExtract, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::{
    ChatTurnRequest, ChatTurnResponse, ClearSessionResponse, HistoryResponse, TurnResponse,
};
use crate::handlers::problem_details;
use crate::server::AppState;

// ============================================================================
// Query Types
// ============================================================================

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/chat
pub async fn chat_turn(
    State(state): State<AppState>,
    Json(req): Json<ChatTurnRequest>,
) -> Response {
    if req.session_id.trim().is_empty() {
        return problem_details::bad_request("session_id cannot be empty").into_response();
    }
    if req.message.trim().is_empty() {
        return problem_details::bad_request("message cannot be empty").into_response();
    }

    let outcome = match state
        .orchestrator
        .handle_turn(&req.session_id, &req.message)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            return problem_details::internal_error(format!("chat turn failed: {e}"))
                .into_response();
        }
    };

    let response = ChatTurnResponse {
        session_id: req.session_id,
        reply: outcome.reply,
        booking_active: outcome.booking_active,
        booking_complete: outcome.booking_complete,
        booking: outcome.booking,
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/v1/chat/{session_id}/history
pub async fn get_history(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let turns = match state.orchestrator.history(&session_id).await {
        Ok(Some(turns)) => turns,
        Ok(None) => return problem_details::not_found("session not found").into_response(),
        Err(e) => {
            return problem_details::internal_error(format!("failed to load history: {e}"))
                .into_response();
        }
    };

    // Most recent turns win when a limit is given.
    let skip = query
        .limit
        .map_or(0, |limit| turns.len().saturating_sub(limit));
    let turns: Vec<TurnResponse> = turns
        .into_iter()
        .skip(skip)
        .map(|t| TurnResponse {
            role: t.role.to_string(),
            content: t.content,
            timestamp: t.timestamp.to_rfc3339(),
        })
        .collect();

    let response = HistoryResponse {
        turn_count: turns.len(),
        session_id,
        turns,
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// DELETE /api/v1/chat/{session_id}
pub async fn clear_session(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
) -> Response {
    if let Err(e) = state.orchestrator.clear(&session_id).await {
        return problem_details::internal_error(format!("failed to clear session: {e}"))
            .into_response();
    }

    (
        StatusCode::OK,
        Json(ClearSessionResponse {
            session_id,
            cleared: true,
        }),
    )
        .into_response()
}
