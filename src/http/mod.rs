//! HTTP and WebSocket glue around the session core
//!
//! - GET /health - Health check
//! - GET /media-stream - Telephony media stream (WebSocket, one session per connection)
//! - GET /sessions - List live sessions
//! - POST /sessions/:id/say - Speak text into a live call
//! - POST /sessions/:id/hangup - End a live call

mod handlers;
mod media_stream;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
