use super::handlers;
use super::media_stream;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Telephony media stream (WebSocket)
        .route("/media-stream", get(media_stream::media_stream))
        // Live session control
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:session_id/say", post(handlers::say))
        .route("/sessions/:session_id/hangup", post(handlers::hangup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
