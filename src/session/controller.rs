use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::{generate_session_id, SessionConfig};
use super::events::{
    ControlMessage, DtmfEvent, MediaEvent, SessionOutput, StartEvent, TransportEvent,
};
use super::stats::{SessionState, SessionSummary};
use crate::audio::{codec, AudioEncoding, RecordingSink, RecordingSummary};
use crate::error::{MergeError, SessionError, TransportError};
use crate::merge::StreamMerger;
use crate::providers::{AgentHandle, AsrHandle, EchoAgent, ProviderRegistry, TtsHandle};

/// Inputs a session multiplexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// The call's media stream
    Transport,
    /// Out-of-band commands (HTTP control API, browser sidecar)
    Control,
}

enum SessionInput {
    Transport(String),
    Disconnected,
    Control(ControlMessage),
}

/// Backends a session talks to, resolved once at creation
#[derive(Clone)]
pub struct SessionProviders {
    pub asr: AsrHandle,
    pub tts: TtsHandle,
    pub agent: AgentHandle,
}

impl SessionProviders {
    /// Resolve backends by name; unknown names use the registry defaults
    pub fn resolve(registry: &ProviderRegistry, asr: &str, tts: &str) -> Self {
        Self {
            asr: registry.resolve_asr(asr),
            tts: registry.resolve_tts(tts),
            agent: Arc::new(EchoAgent),
        }
    }

    pub fn with_agent(mut self, agent: AgentHandle) -> Self {
        self.agent = agent;
        self
    }
}

/// Per-call state machine: `Idle → Recording → Closed`
///
/// Consumes transport events one at a time. Media is decoded, appended to
/// the call's recording and, independently, buffered for the speech
/// pipeline. Only a failed sink open, a stop/hangup, or the transport going
/// away ends the session; bad frames and provider failures are logged and
/// skipped.
pub struct AudioSession {
    id: String,
    config: SessionConfig,
    state: SessionState,

    /// Recording for this call, opened on the first start event
    sink: Option<RecordingSink>,

    /// Set when the sink is closed
    recording: Option<RecordingSummary>,

    /// Media format declared by the start event
    encoding: AudioEncoding,
    sample_rate: u32,
    channels: u16,

    frame_count: u64,

    /// Caller audio waiting for the next transcription call
    asr_buffer: Vec<i16>,

    /// Released on close
    providers: Option<SessionProviders>,

    outbound: mpsc::Sender<SessionOutput>,
    started_at: DateTime<Utc>,
}

impl AudioSession {
    pub fn new(
        config: SessionConfig,
        providers: SessionProviders,
        outbound: mpsc::Sender<SessionOutput>,
    ) -> Self {
        let sample_rate = config.default_sample_rate;
        Self {
            id: generate_session_id(),
            config,
            state: SessionState::Idle,
            sink: None,
            recording: None,
            encoding: AudioEncoding::MuLaw,
            sample_rate,
            channels: 1,
            frame_count: 0,
            asr_buffer: Vec::new(),
            providers: Some(providers),
            outbound,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Recording details once the sink has been closed
    pub fn recording(&self) -> Option<&RecordingSummary> {
        self.recording.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionSummary {
            session_id: self.id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames: self.frame_count,
            recording: self
                .recording
                .clone()
                .or_else(|| self.sink.as_ref().map(RecordingSink::summary)),
        }
    }

    /// Drive the session until it closes
    ///
    /// `transport` yields raw JSON text messages; its end is treated as a
    /// disconnect. `control` carries sidecar commands and may stay open
    /// forever; its pending read is cancelled once the session closes.
    pub async fn run<T, C>(
        mut self,
        transport: T,
        control: C,
    ) -> Result<SessionSummary, SessionError>
    where
        T: Stream<Item = Result<String, TransportError>> + Send + 'static,
        C: Stream<Item = ControlMessage> + Send + 'static,
    {
        let span = info_span!("session", initial_id = %self.id);
        let result = self.drive(transport, control).instrument(span).await;
        self.emit(SessionOutput::Closed).await;
        result.map(|()| self.summary())
    }

    async fn drive<T, C>(&mut self, transport: T, control: C) -> Result<(), SessionError>
    where
        T: Stream<Item = Result<String, TransportError>> + Send + 'static,
        C: Stream<Item = ControlMessage> + Send + 'static,
    {
        let transport: BoxStream<'static, Result<SessionInput, TransportError>> = transport
            .map(|message| message.map(SessionInput::Transport))
            .chain(stream::once(async { Ok(SessionInput::Disconnected) }))
            .boxed();
        let control: BoxStream<'static, Result<SessionInput, TransportError>> = control
            .map(|message| Ok(SessionInput::Control(message)))
            .boxed();

        let sources = [
            (InputSource::Transport, transport),
            (InputSource::Control, control),
        ];
        let mut inputs = StreamMerger::new();
        for (source, input) in sources {
            inputs
                .add(source, input)
                .map_err(|e| SessionError::Transport(TransportError::new(e)))?;
        }

        while let Some(next) = inputs.next().await {
            match next {
                Ok((_, SessionInput::Transport(raw))) => self.handle_message(&raw).await?,
                Ok((_, SessionInput::Disconnected)) => {
                    self.close("transport disconnected");
                }
                Ok((_, SessionInput::Control(message))) => self.handle_control(message).await,
                Err(MergeError::Source { key, error }) => {
                    warn!(session_id = %self.id, source = ?key, "Session input failed: {}", error);
                    self.close("transport error");
                    return Err(SessionError::Transport(error));
                }
                Err(other) => {
                    self.close("input error");
                    return Err(SessionError::Transport(TransportError::new(other)));
                }
            }

            if self.state == SessionState::Closed {
                break;
            }
        }

        if self.state != SessionState::Closed {
            self.close("inputs exhausted");
        }

        Ok(())
    }

    /// Parse and dispatch one raw transport message
    ///
    /// Malformed messages are logged and dropped.
    pub async fn handle_message(&mut self, raw: &str) -> Result<(), SessionError> {
        match TransportEvent::parse(raw) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    state = ?self.state,
                    "Dropping malformed event: {}",
                    e
                );
                Ok(())
            }
        }
    }

    /// Apply one transport event to the state machine
    ///
    /// Returns an error only when the session cannot continue (sink open
    /// failure); the session is already closed when that happens.
    pub async fn handle_event(&mut self, event: TransportEvent) -> Result<(), SessionError> {
        match event {
            TransportEvent::Start(start) => self.on_start(start).await?,
            TransportEvent::Media(media) => self.on_media(media).await,
            TransportEvent::Dtmf(dtmf) => self.on_dtmf(dtmf).await,
            TransportEvent::Stop(stop) => {
                if self.state != SessionState::Closed {
                    debug!(session_id = %self.id, call_sid = ?stop.call_sid, "Stop received");
                    self.close("stop");
                }
            }
            TransportEvent::Connected { protocol } => {
                debug!(session_id = %self.id, ?protocol, "Transport connected");
            }
            TransportEvent::Mark { name } => {
                debug!(session_id = %self.id, ?name, "Mark acknowledged");
            }
            TransportEvent::Unknown(kind) => {
                info!(session_id = %self.id, kind = %kind, "Ignoring unrecognized event");
            }
        }

        Ok(())
    }

    async fn on_start(&mut self, start: StartEvent) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            warn!(session_id = %self.id, state = ?self.state, "Duplicate start ignored");
            return Ok(());
        }

        if let Some(stream_sid) = start.stream_sid {
            self.id = stream_sid;
        }
        if start.sample_rate > 0 {
            self.sample_rate = start.sample_rate;
        }
        self.encoding = start.encoding;
        self.channels = start.channels.max(1);

        let dir = &self.config.recordings_dir;
        match RecordingSink::open(dir, &self.id, self.sample_rate, self.channels) {
            Ok(sink) => {
                info!(
                    session_id = %self.id,
                    call_sid = ?start.call_sid,
                    encoding = ?start.encoding,
                    sample_rate = self.sample_rate,
                    channels = self.channels,
                    path = %sink.path().display(),
                    "Session started"
                );
                self.sink = Some(sink);
                self.state = SessionState::Recording;
                self.emit(SessionOutput::Started {
                    session_id: self.id.clone(),
                })
                .await;
                Ok(())
            }
            Err(e) => {
                error!(session_id = %self.id, "Failed to open recording: {}", e);
                self.close("sink open failed");
                Err(SessionError::SinkOpen(e))
            }
        }
    }

    async fn on_media(&mut self, media: MediaEvent) {
        match self.state {
            SessionState::Recording => {}
            SessionState::Idle => {
                warn!(session_id = %self.id, "Media before start discarded");
                return;
            }
            SessionState::Closed => return,
        }

        if !media.is_inbound() {
            debug!(session_id = %self.id, track = ?media.track, "Skipping non-inbound media");
            return;
        }

        let decoded = codec::decode_interleaved(self.encoding, &media.payload, self.channels);
        let samples = match decoded {
            Ok(samples) => samples,
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    frame = self.frame_count,
                    "Dropping undecodable frame: {}",
                    e
                );
                return;
            }
        };

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.append(&samples) {
                error!(
                    session_id = %self.id,
                    frame = self.frame_count,
                    "Recording append failed: {}",
                    e
                );
            }
        }

        self.frame_count += 1;
        let interval = self.config.frame_log_interval;
        if interval > 0 && self.frame_count % interval == 0 {
            debug!(session_id = %self.id, frames = self.frame_count, "Frames decoded");
        }

        // The speech pipeline consumes the same decoded frame through its own buffer
        if self.config.asr_window_ms > 0 {
            self.asr_buffer.extend_from_slice(&samples);
            if self.asr_buffer.len() >= self.config.asr_window_samples(self.sample_rate) {
                self.run_turn().await;
            }
        }
    }

    async fn on_dtmf(&mut self, dtmf: DtmfEvent) {
        if self.state != SessionState::Recording {
            debug!(session_id = %self.id, state = ?self.state, "DTMF outside recording ignored");
            return;
        }

        info!(session_id = %self.id, digit = %dtmf.digit, "DTMF received");
        self.emit(SessionOutput::Dtmf { digit: dtmf.digit }).await;
    }

    async fn handle_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Say { text } => {
                if self.state == SessionState::Recording {
                    self.speak(&text).await;
                } else {
                    debug!(
                        session_id = %self.id,
                        state = ?self.state,
                        "Say ignored outside recording"
                    );
                }
            }
            ControlMessage::Hangup => {
                info!(session_id = %self.id, "Hangup requested");
                self.close("hangup");
            }
        }
    }

    /// Transcribe the buffered audio, ask the agent for a reply, and speak it
    async fn run_turn(&mut self) {
        let Some(providers) = self.providers.clone() else {
            return;
        };
        let audio = codec::pcm_to_le_bytes(&std::mem::take(&mut self.asr_buffer));

        let asr_started = Instant::now();
        let transcript = match providers.asr.transcribe(&audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    provider = providers.asr.name(),
                    "Transcription failed: {}",
                    e
                );
                return;
            }
        };
        let asr_ms = asr_started.elapsed().as_millis() as u64;

        if transcript.trim().is_empty() {
            return;
        }
        self.emit(SessionOutput::Transcript {
            text: transcript.clone(),
        })
        .await;

        let agent_started = Instant::now();
        let reply = match providers.agent.reply(&transcript).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                warn!(session_id = %self.id, "Agent reply failed: {}", e);
                return;
            }
        };
        let agent_ms = agent_started.elapsed().as_millis() as u64;

        let tts_started = Instant::now();
        if self.speak(&reply).await {
            let tts_ms = tts_started.elapsed().as_millis() as u64;
            info!(session_id = %self.id, asr_ms, agent_ms, tts_ms, "Turn completed");
        }
    }

    /// Synthesize `text` and hand the audio to the transport
    async fn speak(&mut self, text: &str) -> bool {
        let Some(tts) = self.providers.as_ref().map(|p| Arc::clone(&p.tts)) else {
            return false;
        };

        match tts.synthesize(text).await {
            Ok(audio) => {
                debug!(
                    session_id = %self.id,
                    provider = tts.name(),
                    bytes = audio.len(),
                    "Sending synthesized audio"
                );
                self.emit(SessionOutput::Audio {
                    stream_id: self.id.clone(),
                    audio,
                })
                .await;
                true
            }
            Err(e) => {
                warn!(session_id = %self.id, provider = tts.name(), "Synthesis failed: {}", e);
                false
            }
        }
    }

    /// Move to `Closed`: finalize the recording and release providers
    ///
    /// Only the first call has any effect.
    pub fn close(&mut self, reason: &str) -> Option<&RecordingSummary> {
        if self.state == SessionState::Closed {
            return self.recording.as_ref();
        }
        self.state = SessionState::Closed;

        if let Some(mut sink) = self.sink.take() {
            let summary = match sink.close() {
                Ok(summary) => summary,
                Err(e) => {
                    error!(session_id = %self.id, "Failed to finalize recording: {}", e);
                    sink.summary()
                }
            };
            self.recording = Some(summary);
        }

        self.providers = None;
        self.asr_buffer.clear();

        info!(session_id = %self.id, reason, frames = self.frame_count, "Session closed");
        self.recording.as_ref()
    }

    async fn emit(&self, output: SessionOutput) {
        if self.outbound.send(output).await.is_err() {
            debug!(session_id = %self.id, "Transport output closed, dropping message");
        }
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.close("dropped");
        }
    }
}
