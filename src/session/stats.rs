use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audio::RecordingSummary;

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Connected, waiting for the start event
    Idle,
    /// Start seen, media is being recorded
    Recording,
    /// Terminal; the sink has been closed
    Closed,
}

/// Final report of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,

    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,

    /// Number of media frames accepted
    pub frames: u64,

    /// Recording details, if a start event was seen
    pub recording: Option<RecordingSummary>,
}
