use std::path::PathBuf;

use crate::audio::TELEPHONY_SAMPLE_RATE;
use crate::config::Config;

/// Configuration for a call session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory recordings are written to (must already exist)
    pub recordings_dir: PathBuf,

    /// Sample rate assumed when the start event does not declare one
    pub default_sample_rate: u32,

    /// Amount of caller audio buffered before each transcription call
    /// (0 disables the speech pipeline)
    pub asr_window_ms: u64,

    /// Log a progress line every N accepted media frames
    pub frame_log_interval: u64,
}

impl SessionConfig {
    /// Number of samples that make up one transcription window
    pub fn asr_window_samples(&self, sample_rate: u32) -> usize {
        (u64::from(sample_rate) * self.asr_window_ms / 1000) as usize
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("recordings"),
            default_sample_rate: TELEPHONY_SAMPLE_RATE,
            asr_window_ms: 1000,
            frame_log_interval: 100,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            recordings_dir: config.recordings.dir.clone(),
            default_sample_rate: config.session.default_sample_rate,
            asr_window_ms: config.session.asr_window_ms,
            frame_log_interval: config.session.frame_log_interval,
        }
    }
}

/// Identifier for a session whose transport supplied no stream ID
pub fn generate_session_id() -> String {
    format!("call-{}", uuid::Uuid::new_v4().simple())
}
