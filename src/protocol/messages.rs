use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;

/// Server-side classification of a recognized utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Step navigation (the server's next/previous/repeat vocabulary)
    Command,
    /// Informational question; the reply text is spoken verbatim
    Question,
    /// Background noise; ignored
    Noise,
    /// Empty or unrecognized intent string
    Unknown,
}

impl Intent {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "question" => Self::Question,
            "noise" => Self::Noise,
            "" => Self::Unknown,
            _ => Self::Command,
        }
    }
}

/// One decoded agent reply
///
/// Constructed per inbound text frame, consumed immediately by the session,
/// never retained.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub intent: Intent,
    pub transcript: String,
    pub text_response: String,
    /// Server-authoritative step index; may be out of bounds for the
    /// loaded step list, callers bounds-check before any lookup
    pub current_step: usize,
}

/// Wire shape of an agent reply; every field optional
#[derive(Debug, Serialize, Deserialize)]
struct WireReply {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    text_response: String,
    #[serde(default)]
    current_step: usize,
}

/// Decode an inbound text frame into an `AgentReply`
///
/// Tolerant by contract: missing fields default, and anything that is not
/// JSON comes back as a fallback reply carrying the raw text so the session
/// can still display it. Never fails.
pub fn decode_reply(text: &str) -> AgentReply {
    match serde_json::from_str::<WireReply>(text) {
        Ok(wire) => AgentReply {
            intent: Intent::from_wire(&wire.intent),
            transcript: wire.transcript,
            text_response: wire.text_response,
            current_step: wire.current_step,
        },
        Err(_) => AgentReply {
            intent: Intent::Unknown,
            transcript: String::new(),
            text_response: text.to_string(),
            current_step: 0,
        },
    }
}

/// Encode a captured frame for the wire
///
/// Raw little-endian PCM16 bytes, no header or framing: one binary message
/// per frame, in capture order.
pub fn frame_to_bytes(frame: &AudioFrame) -> Vec<u8> {
    frame
        .samples
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_mapping() {
        assert_eq!(Intent::from_wire("question"), Intent::Question);
        assert_eq!(Intent::from_wire("noise"), Intent::Noise);
        assert_eq!(Intent::from_wire(""), Intent::Unknown);
        assert_eq!(Intent::from_wire("next"), Intent::Command);
        assert_eq!(Intent::from_wire("previous"), Intent::Command);
        assert_eq!(Intent::from_wire("repeat"), Intent::Command);
    }

    #[test]
    fn test_decode_full_reply() {
        let reply = decode_reply(
            r#"{"intent":"command","transcript":"next step","text_response":"moving on","current_step":2}"#,
        );
        assert_eq!(reply.intent, Intent::Command);
        assert_eq!(reply.transcript, "next step");
        assert_eq!(reply.text_response, "moving on");
        assert_eq!(reply.current_step, 2);
    }

    #[test]
    fn test_decode_missing_fields_default() {
        let reply = decode_reply(r#"{"intent":"question"}"#);
        assert_eq!(reply.intent, Intent::Question);
        assert_eq!(reply.transcript, "");
        assert_eq!(reply.text_response, "");
        assert_eq!(reply.current_step, 0);
    }
}
