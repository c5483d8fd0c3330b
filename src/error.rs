//! Error types for the audio session core
//!
//! Each concern gets its own enum so the session controller can decide,
//! per kind, whether a failure is isolated to one event or ends the call.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed media frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty media frame")]
    EmptyFrame,

    #[error("frame length {len} is not a multiple of {unit} bytes")]
    InvalidLength { len: usize, unit: usize },
}

/// Recording sink failures
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("recording sink is closed")]
    Closed,

    #[error("failed to create recording {path:?}: {error}")]
    Open {
        path: PathBuf,
        #[source]
        error: hound::Error,
    },

    #[error("failed to write recording: {0}")]
    Write(#[source] hound::Error),

    #[error("failed to finalize recording: {0}")]
    Finalize(#[source] hound::Error),
}

/// A recognition or synthesis backend call failed
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },
}

/// Errors surfaced by [`crate::merge::StreamMerger`]
#[derive(Error, Debug)]
pub enum MergeError<K, E> {
    /// A source failed; every other pending read was cancelled first
    #[error("merge source {key:?} failed: {error}")]
    Source { key: K, error: E },

    #[error("duplicate merge source {0:?}")]
    DuplicateSource(K),
}

/// Unexpected or unparseable transport event
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid event JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("event is missing the `event` field")]
    MissingEventType,

    #[error("`{0}` event has no `{0}` body")]
    MissingBody(&'static str),

    #[error("invalid media payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("unsupported media encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Transport-level failure reported by the connection feeding a session
#[derive(Error, Debug, Clone)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Failures that end a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("could not open recording sink: {0}")]
    SinkOpen(#[source] SinkError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
