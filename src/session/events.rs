use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::{AudioEncoding, TELEPHONY_SAMPLE_RATE};
use crate::error::ProtocolError;

// ============================================================================
// Inbound transport events
// ============================================================================

/// A typed event from the telephony media stream
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake sent before `start`
    Connected { protocol: Option<String> },
    Start(StartEvent),
    Media(MediaEvent),
    Dtmf(DtmfEvent),
    /// Playback acknowledgement for a previously sent mark
    Mark { name: Option<String> },
    Stop(StopEvent),
    /// Any event type this crate does not handle
    Unknown(String),
}

/// Call start: stream identity and media format
#[derive(Debug, Clone, PartialEq)]
pub struct StartEvent {
    pub stream_sid: Option<String>,
    pub call_sid: Option<String>,
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub channels: u16,
}

/// One encoded media frame
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    /// Track name (`inbound` / `outbound`), if the transport sends one
    pub track: Option<String>,
    /// Base64-decoded codec bytes
    pub payload: Vec<u8>,
}

impl MediaEvent {
    /// Whether the frame carries the caller's audio
    pub fn is_inbound(&self) -> bool {
        match self.track.as_deref() {
            None => true,
            Some(track) => track.starts_with("inbound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DtmfEvent {
    pub digit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopEvent {
    pub call_sid: Option<String>,
}

// Wire shapes of the event bodies

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartBody {
    #[serde(default)]
    stream_sid: Option<String>,
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    media_format: Option<MediaFormatBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaFormatBody {
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    sample_rate: Option<u32>,
    #[serde(default)]
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct MediaBody {
    #[serde(default)]
    track: Option<String>,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct DtmfBody {
    digit: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopBody {
    #[serde(default)]
    call_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarkBody {
    #[serde(default)]
    name: Option<String>,
}

impl TransportEvent {
    /// Parse one JSON text message from the media stream
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut value: Value = serde_json::from_str(raw)?;

        let event = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingEventType)?
            .to_string();
        let envelope_sid = value
            .get("streamSid")
            .and_then(Value::as_str)
            .map(str::to_string);

        match event.as_str() {
            "connected" => Ok(Self::Connected {
                protocol: value.get("protocol").and_then(Value::as_str).map(str::to_string),
            }),
            "start" => {
                let body: StartBody = take_body(&mut value, "start")?;
                let format = body.media_format;

                let encoding_name = format
                    .as_ref()
                    .and_then(|f| f.encoding.clone())
                    .unwrap_or_else(|| "audio/x-mulaw".to_string());
                let encoding = AudioEncoding::from_name(&encoding_name)
                    .ok_or(ProtocolError::UnsupportedEncoding(encoding_name))?;

                Ok(Self::Start(StartEvent {
                    stream_sid: body.stream_sid.or(envelope_sid),
                    call_sid: body.call_sid,
                    encoding,
                    sample_rate: format
                        .as_ref()
                        .and_then(|f| f.sample_rate)
                        .unwrap_or(TELEPHONY_SAMPLE_RATE),
                    channels: format.as_ref().and_then(|f| f.channels).unwrap_or(1),
                }))
            }
            "media" => {
                let body: MediaBody = take_body(&mut value, "media")?;
                let payload = base64::engine::general_purpose::STANDARD.decode(body.payload)?;
                Ok(Self::Media(MediaEvent {
                    track: body.track,
                    payload,
                }))
            }
            "dtmf" => {
                let body: DtmfBody = take_body(&mut value, "dtmf")?;
                Ok(Self::Dtmf(DtmfEvent { digit: body.digit }))
            }
            "mark" => {
                let body: MarkBody = take_body(&mut value, "mark")?;
                Ok(Self::Mark { name: body.name })
            }
            "stop" => {
                // Some transports send a bare stop without a body
                let body: StopBody = match value.get_mut("stop").map(Value::take) {
                    Some(body) => serde_json::from_value(body)?,
                    None => StopBody::default(),
                };
                Ok(Self::Stop(StopEvent {
                    call_sid: body.call_sid,
                }))
            }
            _ => Ok(Self::Unknown(event)),
        }
    }

    /// Event type name for logging
    pub fn kind(&self) -> &str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Start(_) => "start",
            Self::Media(_) => "media",
            Self::Dtmf(_) => "dtmf",
            Self::Mark { .. } => "mark",
            Self::Stop(_) => "stop",
            Self::Unknown(name) => name.as_str(),
        }
    }
}

fn take_body<T: serde::de::DeserializeOwned>(
    value: &mut Value,
    field: &'static str,
) -> Result<T, ProtocolError> {
    let body = value
        .get_mut(field)
        .map(Value::take)
        .ok_or(ProtocolError::MissingBody(field))?;
    Ok(serde_json::from_value(body)?)
}

// ============================================================================
// Sidecar control channel and session output
// ============================================================================

/// Commands injected into a live session from outside the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Synthesize `text` and play it to the caller
    Say { text: String },
    /// End the call
    Hangup,
}

/// What a session hands back to its transport
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Recording started; `session_id` is final from here on
    Started { session_id: String },
    /// Synthesized audio for the far end
    Audio { stream_id: String, audio: Vec<u8> },
    /// A recognized utterance
    Transcript { text: String },
    /// Touch-tone digit for call-control logic
    Dtmf { digit: String },
    /// The session reached its terminal state
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_defaults_and_envelope_sid() {
        let raw = r#"{"event":"start","streamSid":"MZ1","start":{}}"#;
        let event = TransportEvent::parse(raw).unwrap();

        match event {
            TransportEvent::Start(start) => {
                assert_eq!(start.stream_sid.as_deref(), Some("MZ1"));
                assert_eq!(start.encoding, AudioEncoding::MuLaw);
                assert_eq!(start.sample_rate, 8000);
                assert_eq!(start.channels, 1);
            }
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_start_with_unsupported_encoding() {
        let raw = r#"{"event":"start","start":{"mediaFormat":{"encoding":"audio/opus"}}}"#;
        assert!(matches!(
            TransportEvent::parse(raw),
            Err(ProtocolError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_media_payload_is_decoded() {
        let raw = r#"{"event":"media","media":{"payload":"/38A"}}"#;
        let event = TransportEvent::parse(raw).unwrap();

        assert_eq!(
            event,
            TransportEvent::Media(MediaEvent {
                track: None,
                payload: vec![0xFF, 0x7F, 0x00],
            })
        );
    }

    #[test]
    fn test_bare_stop_and_unknown_events() {
        assert!(matches!(
            TransportEvent::parse(r#"{"event":"stop"}"#),
            Ok(TransportEvent::Stop(StopEvent { call_sid: None }))
        ));

        let event = TransportEvent::parse(r#"{"event":"clear"}"#).unwrap();
        assert_eq!(event.kind(), "clear");
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            TransportEvent::parse(r#"{"media":{}}"#),
            Err(ProtocolError::MissingEventType)
        ));
        assert!(matches!(
            TransportEvent::parse(r#"{"event":"dtmf"}"#),
            Err(ProtocolError::MissingBody("dtmf"))
        ));
    }

    #[test]
    fn test_control_message_wire_format() {
        let say: ControlMessage = serde_json::from_str(r#"{"type":"say","text":"hi"}"#).unwrap();
        assert_eq!(say, ControlMessage::Say { text: "hi".to_string() });

        let hangup = serde_json::to_string(&ControlMessage::Hangup).unwrap();
        assert_eq!(hangup, r#"{"type":"hangup"}"#);
    }
}
