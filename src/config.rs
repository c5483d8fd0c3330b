use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::TELEPHONY_SAMPLE_RATE;

/// Environment prefix for overrides, e.g. `VOICE_BRIDGE__PROVIDERS__ASR=deepgram`
pub const ENV_PREFIX: &str = "VOICE_BRIDGE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recordings: RecordingsConfig,
    pub providers: ProvidersConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingsConfig {
    pub dir: PathBuf,
}

/// Default backend names
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub asr: String,
    pub tts: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub asr_window_ms: u64,
    pub frame_log_interval: u64,
    pub default_sample_rate: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-bridge".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for RecordingsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("recordings"),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            asr: "openai".to_string(),
            tts: "openai".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            asr_window_ms: 1000,
            frame_log_interval: 100,
            default_sample_rate: TELEPHONY_SAMPLE_RATE,
        }
    }
}

impl Config {
    /// Load from an optional config file, then apply environment overrides
    ///
    /// `ASR_PROVIDER` / `TTS_PROVIDER` are honoured as shorthands for the
    /// provider defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let mut cfg: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Ok(asr) = std::env::var("ASR_PROVIDER") {
            cfg.providers.asr = asr;
        }
        if let Ok(tts) = std::env::var("TTS_PROVIDER") {
            cfg.providers.tts = tts;
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();

        assert_eq!(cfg.service.http.port, 8000);
        assert_eq!(cfg.recordings.dir, PathBuf::from("recordings"));
        assert_eq!(cfg.providers.asr, "openai");
        assert_eq!(cfg.session.default_sample_rate, 8000);
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("bridge.toml");
        std::fs::write(
            &path,
            "[recordings]\ndir = \"/tmp/calls\"\n\n[session]\nasr_window_ms = 500\n",
        )?;

        let cfg = Config::load(path.with_extension("").to_str().unwrap_or_default())?;

        assert_eq!(cfg.recordings.dir, PathBuf::from("/tmp/calls"));
        assert_eq!(cfg.session.asr_window_ms, 500);
        assert_eq!(cfg.session.frame_log_interval, 100);
        Ok(())
    }
}
