// WebSocket bridge between a telephony media stream and an AudioSession
//
// Inbound text frames go to the session untouched; session output is
// serialized back into media-stream messages. The session's control channel
// is published in AppState once the call's stream ID is known.

use super::state::AppState;
use crate::error::TransportError;
use crate::session::{AudioSession, SessionConfig, SessionOutput, SessionProviders};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Per-connection provider selection, e.g. `/media-stream?asr=deepgram&tts=azure`
#[derive(Debug, Default, Deserialize)]
pub struct MediaStreamParams {
    pub asr: Option<String>,
    pub tts: Option<String>,
}

/// Outbound audio in media-stream framing
#[derive(Debug, Serialize)]
struct OutboundMedia<'a> {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: &'a str,
    media: OutboundPayload,
}

#[derive(Debug, Serialize)]
struct OutboundPayload {
    payload: String,
}

impl<'a> OutboundMedia<'a> {
    fn new(stream_sid: &'a str, audio: &[u8]) -> Self {
        Self {
            event: "media",
            stream_sid,
            media: OutboundPayload {
                payload: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        }
    }
}

/// GET /media-stream
/// Upgrade to a WebSocket and run one call session on it
pub async fn media_stream(
    ws: WebSocketUpgrade,
    Query(params): Query<MediaStreamParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn handle_socket(socket: WebSocket, params: MediaStreamParams, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();

    let asr_name = params.asr.unwrap_or_else(|| state.config.providers.asr.clone());
    let tts_name = params.tts.unwrap_or_else(|| state.config.providers.tts.clone());
    let providers = SessionProviders::resolve(&state.registry, &asr_name, &tts_name);
    info!(asr = providers.asr.name(), tts = providers.tts.name(), "Media stream connected");

    let (output_tx, mut output_rx) = mpsc::channel::<SessionOutput>(64);
    let (control_tx, control_rx) = mpsc::channel(16);

    let config = SessionConfig::from(state.config.as_ref());
    let session = AudioSession::new(config, providers, output_tx);

    let transport = ws_rx.filter_map(|message| async move {
        match message {
            Ok(Message::Text(text)) => Some(Ok(text)),
            Ok(_) => None,
            Err(e) => Some(Err(TransportError::new(e))),
        }
    });

    let session_task = tokio::spawn(session.run(transport, ReceiverStream::new(control_rx)));

    let mut registered: Option<String> = None;
    while let Some(output) = output_rx.recv().await {
        match output {
            SessionOutput::Started { session_id } => {
                if state.register_session(&session_id, control_tx.clone()).await {
                    registered = Some(session_id);
                }
            }
            SessionOutput::Audio { stream_id, audio } => {
                let message = match serde_json::to_string(&OutboundMedia::new(&stream_id, &audio)) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize outbound media: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(message)).await {
                    warn!(stream_id = %stream_id, "Failed to send audio to caller: {}", e);
                    break;
                }
            }
            SessionOutput::Transcript { text } => {
                debug!(session_id = ?registered, text = %text, "Transcript");
            }
            SessionOutput::Dtmf { digit } => {
                info!(session_id = ?registered, digit = %digit, "DTMF forwarded to call control");
            }
            SessionOutput::Closed => break,
        }
    }

    if let Some(session_id) = &registered {
        state.unregister_session(session_id, &control_tx).await;
    }
    drop(control_tx);
    drop(output_rx);

    match session_task.await {
        Ok(Ok(summary)) => info!(
            session_id = %summary.session_id,
            frames = summary.frames,
            duration_secs = summary.duration_secs,
            "Media stream finished"
        ),
        Ok(Err(e)) => warn!(session_id = ?registered, "Session ended with error: {}", e),
        Err(e) => error!("Session task panicked: {}", e),
    }

    if let Err(e) = ws_tx.close().await {
        debug!("WebSocket close failed: {}", e);
    }
}
