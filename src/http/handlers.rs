use super::state::AppState;
use crate::session::ControlMessage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SayRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /sessions
/// List live sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let mut sessions: Vec<String> = state.sessions.read().await.keys().cloned().collect();
    sessions.sort();

    Json(SessionsResponse { sessions })
}

/// POST /sessions/:session_id/say
/// Synthesize text and play it into the call
pub async fn say(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SayRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    send_control(&state, session_id, ControlMessage::Say { text: req.text }).await
}

/// POST /sessions/:session_id/hangup
/// End a live call
pub async fn hangup(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    send_control(&state, session_id, ControlMessage::Hangup).await
}

async fn send_control(
    state: &AppState,
    session_id: String,
    message: ControlMessage,
) -> axum::response::Response {
    let sender = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    let Some(sender) = sender else {
        return not_found(&session_id);
    };

    info!(session_id = %session_id, ?message, "Forwarding control message");

    if sender.send(message).await.is_err() {
        // Session ended between lookup and send
        warn!(session_id = %session_id, "Session control channel closed");
        return not_found(&session_id);
    }

    (
        StatusCode::ACCEPTED,
        Json(ControlResponse {
            session_id,
            status: "accepted".to_string(),
        }),
    )
        .into_response()
}

fn not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
        }),
    )
        .into_response()
}
