//! Speech recognition and synthesis backends
//!
//! Backends sit behind two small capability traits and are looked up by
//! name in a [`ProviderRegistry`]. Adding a vendor means registering a new
//! entry; the session controller never names concrete backends.

mod base;
mod builtin;
mod registry;

pub use base::{AgentHandle, AsrHandle, ReplyAgent, SpeechRecognizer, SpeechSynthesizer, TtsHandle};
pub use builtin::{EchoAgent, PlaceholderRecognizer, PlaceholderSynthesizer};
pub use registry::{ProviderRegistry, FALLBACK_PROVIDER};
