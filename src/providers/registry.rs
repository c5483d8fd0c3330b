use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::base::{AsrHandle, SpeechRecognizer, SpeechSynthesizer, TtsHandle};
use super::builtin::{PlaceholderRecognizer, PlaceholderSynthesizer};
use crate::config::ProvidersConfig;

/// Backend used when neither the requested nor the configured default name is registered
pub const FALLBACK_PROVIDER: &str = "openai";

/// Name-keyed table of recognition and synthesis backends
///
/// Built once at startup and shared read-only behind an `Arc`. Lookups are
/// case-insensitive and never fail: unknown names resolve to the default.
pub struct ProviderRegistry {
    asr: HashMap<String, AsrHandle>,
    tts: HashMap<String, TtsHandle>,
    default_asr: String,
    default_tts: String,
    fallback_asr: AsrHandle,
    fallback_tts: TtsHandle,
}

impl ProviderRegistry {
    /// Registry holding only the fallback backends, with the given default names
    pub fn new(default_asr: &str, default_tts: &str) -> Self {
        let fallback_asr: AsrHandle = Arc::new(PlaceholderRecognizer::new(FALLBACK_PROVIDER));
        let fallback_tts: TtsHandle = Arc::new(PlaceholderSynthesizer::new(FALLBACK_PROVIDER));

        let mut registry = Self {
            asr: HashMap::new(),
            tts: HashMap::new(),
            default_asr: normalize(default_asr),
            default_tts: normalize(default_tts),
            fallback_asr: Arc::clone(&fallback_asr),
            fallback_tts: Arc::clone(&fallback_tts),
        };
        registry.register_asr(FALLBACK_PROVIDER, fallback_asr);
        registry.register_tts(FALLBACK_PROVIDER, fallback_tts);
        registry
    }

    /// Registry populated with the offline backends
    pub fn with_builtin(config: &ProvidersConfig) -> Self {
        let mut registry = Self::new(&config.asr, &config.tts);

        registry.register_asr("deepgram", Arc::new(PlaceholderRecognizer::new("deepgram")));

        registry.register_tts("elevenlabs", Arc::new(PlaceholderSynthesizer::new("elevenlabs")));
        let azure: TtsHandle = Arc::new(PlaceholderSynthesizer::new("azure"));
        registry.register_tts("azure", Arc::clone(&azure));
        registry.register_tts("microsoft-azure", azure);

        registry
    }

    /// Add or replace a recognition backend
    pub fn register_asr(&mut self, name: &str, handle: Arc<dyn SpeechRecognizer>) {
        self.asr.insert(normalize(name), handle);
    }

    /// Add or replace a synthesis backend
    pub fn register_tts(&mut self, name: &str, handle: Arc<dyn SpeechSynthesizer>) {
        self.tts.insert(normalize(name), handle);
    }

    /// Resolve a recognition backend, falling back to the default
    pub fn resolve_asr(&self, name: &str) -> AsrHandle {
        resolve(&self.asr, name, &self.default_asr, &self.fallback_asr, "asr")
    }

    /// Resolve a synthesis backend, falling back to the default
    pub fn resolve_tts(&self, name: &str) -> TtsHandle {
        resolve(&self.tts, name, &self.default_tts, &self.fallback_tts, "tts")
    }

    pub fn asr_names(&self) -> Vec<String> {
        sorted_keys(&self.asr)
    }

    pub fn tts_names(&self) -> Vec<String> {
        sorted_keys(&self.tts)
    }

    pub fn default_asr(&self) -> &str {
        &self.default_asr
    }

    pub fn default_tts(&self) -> &str {
        &self.default_tts
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn sorted_keys<V>(table: &HashMap<String, V>) -> Vec<String> {
    let mut names: Vec<String> = table.keys().cloned().collect();
    names.sort();
    names
}

fn resolve<T: ?Sized>(
    table: &HashMap<String, Arc<T>>,
    name: &str,
    default: &str,
    fallback: &Arc<T>,
    kind: &str,
) -> Arc<T> {
    let key = normalize(name);
    if let Some(handle) = table.get(&key) {
        return Arc::clone(handle);
    }

    if !key.is_empty() {
        debug!(kind, requested = %key, default, "Unknown provider, using default");
    }

    if let Some(handle) = table.get(default) {
        return Arc::clone(handle);
    }

    warn!(kind, default, "Default provider not registered, using {}", FALLBACK_PROVIDER);
    Arc::clone(fallback)
}
