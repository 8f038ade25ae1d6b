// Unit tests for the voice-agent wire protocol
//
// Inbound decoding must never fail: the session displays whatever arrives.
// Outbound frames are raw little-endian PCM16 with no framing.

use sous_voice::audio::AudioFrame;
use sous_voice::protocol::{decode_reply, frame_to_bytes, Intent};
use sous_voice::transport::voice_agent_url;

#[test]
fn test_decode_command_reply() {
    let reply = decode_reply(
        r#"{"intent":"next","transcript":"go on","text_response":"moving to step 2","current_step":1}"#,
    );

    assert_eq!(reply.intent, Intent::Command);
    assert_eq!(reply.transcript, "go on");
    assert_eq!(reply.text_response, "moving to step 2");
    assert_eq!(reply.current_step, 1);
}

#[test]
fn test_decode_question_reply() {
    let reply = decode_reply(
        r#"{"intent":"question","transcript":"how much flour","text_response":"You need 2 cups","current_step":0}"#,
    );

    assert_eq!(reply.intent, Intent::Question);
    assert_eq!(reply.text_response, "You need 2 cups");
}

#[test]
fn test_decode_noise_reply() {
    let reply = decode_reply(r#"{"intent":"noise","transcript":"","text_response":"","current_step":3}"#);

    assert_eq!(reply.intent, Intent::Noise);
    assert_eq!(reply.current_step, 3);
}

#[test]
fn test_decode_malformed_json_falls_back_to_raw_text() {
    let reply = decode_reply("not json");

    assert_eq!(reply.intent, Intent::Unknown);
    assert_eq!(reply.transcript, "");
    assert_eq!(reply.text_response, "not json");
    assert_eq!(reply.current_step, 0);
}

#[test]
fn test_decode_missing_fields_default() {
    let reply = decode_reply("{}");

    assert_eq!(reply.intent, Intent::Unknown);
    assert_eq!(reply.transcript, "");
    assert_eq!(reply.text_response, "");
    assert_eq!(reply.current_step, 0);
}

#[test]
fn test_decode_wrong_field_types_fall_back() {
    // A structurally valid JSON document with the wrong shape still never throws
    let reply = decode_reply(r#"{"current_step":"two"}"#);

    assert_eq!(reply.intent, Intent::Unknown);
    assert_eq!(reply.text_response, r#"{"current_step":"two"}"#);
    assert_eq!(reply.current_step, 0);
}

#[test]
fn test_frame_encoding_is_raw_little_endian_pcm() {
    let frame = AudioFrame {
        samples: vec![0x0102, -2],
        sample_rate: 16000,
        timestamp_ms: 0,
    };

    let bytes = frame_to_bytes(&frame);

    // No header: exactly two bytes per sample, little endian
    assert_eq!(bytes, vec![0x02, 0x01, 0xFE, 0xFF]);
}

#[test]
fn test_frame_encoding_preserves_order() {
    let frame = AudioFrame {
        samples: vec![1, 2, 3],
        sample_rate: 16000,
        timestamp_ms: 0,
    };

    let bytes = frame_to_bytes(&frame);
    assert_eq!(bytes.len(), 6);
    assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 1);
    assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 2);
    assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 3);
}

#[test]
fn test_voice_agent_url_scheme_swap() {
    assert_eq!(
        voice_agent_url("http://10.0.2.2:8000", "r1"),
        "ws://10.0.2.2:8000/ws/v1/voice-agent/r1"
    );
    assert_eq!(
        voice_agent_url("https://api.example.com/", "r2"),
        "wss://api.example.com/ws/v1/voice-agent/r2"
    );
}
