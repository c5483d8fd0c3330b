use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::SinkError;

const BITS_PER_SAMPLE: u16 = 16;

/// Final state of a recording once the sink is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingSummary {
    /// File path of the recording
    pub path: PathBuf,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channels in the file
    pub channels: u16,
    /// Number of PCM samples written, across all channels
    pub sample_count: u64,
    /// Size of the PCM data chunk in bytes
    pub data_bytes: u64,
}

/// Append-only WAV writer for a single call
///
/// Created with a provisional header; `close` rewrites the header with the
/// final sizes. Closing twice is a no-op.
pub struct RecordingSink<W: Write + Seek = BufWriter<File>> {
    writer: Option<hound::WavWriter<W>>,
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    sample_count: u64,
}

impl RecordingSink {
    /// Create a new recording in `dir` for the given session
    ///
    /// The file is created exclusively; an existing file is never overwritten.
    pub fn open(
        dir: impl AsRef<Path>,
        session_id: &str,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, SinkError> {
        let path = Self::path_for(dir.as_ref(), session_id);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| SinkError::Open {
                path: path.clone(),
                error: hound::Error::IoError(e),
            })?;

        let sink = Self::from_writer(BufWriter::new(file), path, sample_rate, channels)?;
        info!(path = %sink.path.display(), sample_rate, channels, "Recording sink opened");
        Ok(sink)
    }

    /// Recording file name: sanitized session ID plus a millisecond UTC timestamp
    pub fn path_for(dir: &Path, session_id: &str) -> PathBuf {
        let safe_id: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        dir.join(format!("{}-{}.wav", safe_id, stamp))
    }
}

impl<W: Write + Seek> RecordingSink<W> {
    /// Start a recording on an already opened writer
    ///
    /// `path` is only reported back in the summary. A channel count of zero
    /// is treated as mono.
    pub fn from_writer(
        writer: W,
        path: PathBuf,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, SinkError> {
        let channels = channels.max(1);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::new(writer, spec).map_err(|error| SinkError::Open {
            path: path.clone(),
            error,
        })?;

        Ok(Self {
            writer: Some(writer),
            path,
            sample_rate,
            channels,
            sample_count: 0,
        })
    }

    /// Append interleaved PCM16 samples
    ///
    /// On a write failure the header is flushed so the file on disk reflects
    /// everything written so far, and the error is returned without retrying.
    pub fn append(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;

        for &sample in samples {
            if let Err(e) = writer.write_sample(sample) {
                warn!(path = %self.path.display(), "Recording write failed: {}", e);
                if let Err(flush_err) = writer.flush() {
                    warn!("Best-effort header flush failed: {}", flush_err);
                }
                return Err(SinkError::Write(e));
            }
            self.sample_count += 1;
        }

        Ok(())
    }

    /// Finalize the header and release the writer
    ///
    /// Only the first call touches the file; later calls return the same summary.
    pub fn close(&mut self) -> Result<RecordingSummary, SinkError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(SinkError::Finalize)?;
            info!(
                path = %self.path.display(),
                samples = self.sample_count,
                bytes = self.data_bytes(),
                "Recording sink closed"
            );
        } else {
            debug!(path = %self.path.display(), "Recording sink already closed");
        }

        Ok(self.summary())
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Running size of the PCM data written so far
    pub fn data_bytes(&self) -> u64 {
        self.sample_count * u64::from(BITS_PER_SAMPLE / 8)
    }

    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            path: self.path.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_count: self.sample_count,
            data_bytes: self.data_bytes(),
        }
    }
}

impl<W: Write + Seek> Drop for RecordingSink<W> {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize recording on drop: {}", e);
            }
        }
    }
}
