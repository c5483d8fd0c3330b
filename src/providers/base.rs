use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProviderError;

/// Speech recognition backend
///
/// Implementations may suspend on network I/O. A streaming recognizer that
/// keeps state must be usable from one owning session without extra locking.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe little-endian PCM16 audio
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ProviderError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Speech synthesis backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for `text`, returning encoded audio bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Produces the reply spoken back to the caller for a transcript
///
/// Returning `None` means the turn gets no spoken reply.
#[async_trait]
pub trait ReplyAgent: Send + Sync {
    async fn reply(&self, transcript: &str) -> Result<Option<String>, ProviderError>;
}

pub type AsrHandle = Arc<dyn SpeechRecognizer>;
pub type TtsHandle = Arc<dyn SpeechSynthesizer>;
pub type AgentHandle = Arc<dyn ReplyAgent>;
