//! Offline backends registered by default
//!
//! They answer with fixed placeholder results so the pipeline can run end to
//! end without credentials. Network-backed vendors register alongside them.

use async_trait::async_trait;
use tracing::debug;

use super::base::{ReplyAgent, SpeechRecognizer, SpeechSynthesizer};
use crate::error::ProviderError;

/// Placeholder recognizer returning a fixed transcript
#[derive(Debug, Clone)]
pub struct PlaceholderRecognizer {
    name: &'static str,
}

impl PlaceholderRecognizer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl SpeechRecognizer for PlaceholderRecognizer {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ProviderError> {
        let text = format!("transcribed text from {}", self.name);
        debug!(provider = self.name, bytes = audio.len(), "Transcribed audio");
        Ok(text)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Placeholder synthesizer returning a fixed audio marker
#[derive(Debug, Clone)]
pub struct PlaceholderSynthesizer {
    name: &'static str,
}

impl PlaceholderSynthesizer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl SpeechSynthesizer for PlaceholderSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        debug!(provider = self.name, chars = text.len(), "Synthesized audio");
        Ok(format!("binary audio from {}", self.name).into_bytes())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Speaks the transcript back unchanged
#[derive(Debug, Clone, Default)]
pub struct EchoAgent;

#[async_trait]
impl ReplyAgent for EchoAgent {
    async fn reply(&self, transcript: &str) -> Result<Option<String>, ProviderError> {
        let text = transcript.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}
