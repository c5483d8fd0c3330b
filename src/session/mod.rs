//! Per-call audio session
//!
//! This module provides the `AudioSession` state machine that:
//! - Parses inbound media-stream events (start, media, dtmf, stop)
//! - Decodes μ-law media into PCM16 and records it to a WAV sink
//! - Feeds buffered caller audio through ASR → agent → TTS
//! - Merges the call's transport with a sidecar control channel

mod config;
mod controller;
mod events;
mod stats;

pub use config::{generate_session_id, SessionConfig};
pub use controller::{AudioSession, InputSource, SessionProviders};
pub use events::{
    ControlMessage, DtmfEvent, MediaEvent, SessionOutput, StartEvent, StopEvent, TransportEvent,
};
pub use stats::{SessionState, SessionSummary};
