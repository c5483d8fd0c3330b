pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod merge;
pub mod providers;
pub mod session;

pub use audio::{AudioEncoding, RecordingSink, RecordingSummary};
pub use config::Config;
pub use error::{
    CodecError, MergeError, ProtocolError, ProviderError, SessionError, SinkError, TransportError,
};
pub use http::{create_router, AppState};
pub use merge::StreamMerger;
pub use providers::{ProviderRegistry, ReplyAgent, SpeechRecognizer, SpeechSynthesizer};
pub use session::{
    AudioSession, ControlMessage, SessionConfig, SessionOutput, SessionProviders, SessionState,
    SessionSummary, TransportEvent,
};
