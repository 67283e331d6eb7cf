//! Data-channel framing for audio and control traffic.
//!
//! Audio chunks and control messages share one reliable data channel. With
//! [`FramingMode::Tagged`] every payload carries a leading type byte:
//!
//! ```text
//! ┌──────┬──────────────────────────────┐
//! │ 0x01 │ raw audio chunk              │
//! ├──────┼──────────────────────────────┤
//! │ 0x02 │ UTF-8 JSON {id,label,type,…} │
//! └──────┴──────────────────────────────┘
//! ```
//!
//! [`FramingMode::Legacy`] sends payloads untagged and treats every
//! non-empty inbound payload as audio.

use bytes::{BufMut, Bytes, BytesMut};

use crate::buffer::AudioChunk;
use crate::config::FramingMode;
use crate::error::Result;
use crate::message::RtviMessage;

/// Leading byte of a tagged audio frame.
pub const AUDIO_TAG: u8 = 0x01;
/// Leading byte of a tagged control frame.
pub const CONTROL_TAG: u8 = 0x02;

/// Outcome of classifying an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Audio from the peer; not part of the control path.
    Audio(Bytes),
    /// A decoded control message for the host.
    Control(RtviMessage),
    /// Nothing deliverable.
    Dropped(DropReason),
}

/// Why an inbound payload was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Zero-length payload under tagged framing.
    Empty,
    /// Leading byte is neither tag.
    UnknownTag(u8),
    /// Control payload that is not a valid message.
    Malformed(String),
}

/// Encodes outbound payloads and classifies inbound ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRouter {
    framing: FramingMode,
}

impl MessageRouter {
    /// Create a router for the given framing.
    pub fn new(framing: FramingMode) -> Self {
        Self { framing }
    }

    /// The framing in use.
    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    /// Wire payload for an audio chunk.
    pub fn encode_audio(&self, chunk: &AudioChunk) -> Bytes {
        match self.framing {
            FramingMode::Tagged => tagged(AUDIO_TAG, chunk.as_bytes()),
            FramingMode::Legacy => chunk.as_bytes().clone(),
        }
    }

    /// Wire payload for a control message.
    pub fn encode_control(&self, message: &RtviMessage) -> Result<Bytes> {
        let json = serde_json::to_vec(message)?;
        Ok(match self.framing {
            FramingMode::Tagged => tagged(CONTROL_TAG, &json),
            FramingMode::Legacy => Bytes::from(json),
        })
    }

    /// Classify a payload received on the data channel.
    pub fn classify(&self, payload: Bytes) -> Inbound {
        match self.framing {
            FramingMode::Tagged => classify_tagged(payload),
            FramingMode::Legacy => classify_legacy(payload),
        }
    }
}

fn tagged(tag: u8, body: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(body.len() + 1);
    frame.put_u8(tag);
    frame.put_slice(body);
    frame.freeze()
}

fn classify_tagged(payload: Bytes) -> Inbound {
    let Some(&tag) = payload.first() else {
        return Inbound::Dropped(DropReason::Empty);
    };
    match tag {
        AUDIO_TAG => Inbound::Audio(payload.slice(1..)),
        CONTROL_TAG => decode_control(&payload[1..]),
        other => Inbound::Dropped(DropReason::UnknownTag(other)),
    }
}

fn classify_legacy(payload: Bytes) -> Inbound {
    if !payload.is_empty() {
        return Inbound::Audio(payload);
    }
    decode_control(&payload)
}

fn decode_control(body: &[u8]) -> Inbound {
    match serde_json::from_slice::<RtviMessage>(body) {
        Ok(message) => Inbound::Control(message),
        Err(e) => Inbound::Dropped(DropReason::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_message() -> RtviMessage {
        RtviMessage {
            id: "m-1".to_string(),
            label: "rtvi-ai".to_string(),
            message_type: "bot-ready".to_string(),
            data: json!({"version": "0.3"}),
        }
    }

    #[test]
    fn test_tagged_audio_frame() {
        let router = MessageRouter::new(FramingMode::Tagged);
        let wire = router.encode_audio(&AudioChunk::copy_from_slice(&[7, 8]));
        assert_eq!(wire.as_ref(), &[AUDIO_TAG, 7, 8]);
        assert_eq!(router.classify(wire), Inbound::Audio(Bytes::from_static(&[7, 8])));
    }

    #[test]
    fn test_tagged_control_frame_is_delivered() {
        let router = MessageRouter::new(FramingMode::Tagged);
        let wire = router.encode_control(&sample_message()).unwrap();
        assert_eq!(wire[0], CONTROL_TAG);
        assert_eq!(router.classify(wire), Inbound::Control(sample_message()));
    }

    #[test]
    fn test_tagged_rejects_empty_and_unknown() {
        let router = MessageRouter::new(FramingMode::Tagged);
        assert_eq!(router.classify(Bytes::new()), Inbound::Dropped(DropReason::Empty));
        assert_eq!(
            router.classify(Bytes::from_static(b"{}")),
            Inbound::Dropped(DropReason::UnknownTag(b'{'))
        );
    }

    #[test]
    fn test_tagged_malformed_control() {
        let router = MessageRouter::new(FramingMode::Tagged);
        let inbound = router.classify(Bytes::from_static(&[CONTROL_TAG, b'{', b'x']));
        assert!(matches!(inbound, Inbound::Dropped(DropReason::Malformed(_))));
    }

    #[test]
    fn test_legacy_sends_untagged() {
        let router = MessageRouter::new(FramingMode::Legacy);
        let wire = router.encode_audio(&AudioChunk::copy_from_slice(b"pcm"));
        assert_eq!(wire.as_ref(), b"pcm");

        let wire = router.encode_control(&sample_message()).unwrap();
        let parsed: RtviMessage = serde_json::from_slice(&wire).unwrap();
        assert_eq!(parsed, sample_message());
    }

    #[test]
    fn test_legacy_treats_non_empty_as_audio() {
        let router = MessageRouter::new(FramingMode::Legacy);
        let json = serde_json::to_vec(&sample_message()).unwrap();
        assert!(matches!(router.classify(Bytes::from(json)), Inbound::Audio(_)));
    }

    #[test]
    fn test_legacy_empty_payload_is_malformed() {
        let router = MessageRouter::new(FramingMode::Legacy);
        assert!(matches!(
            router.classify(Bytes::new()),
            Inbound::Dropped(DropReason::Malformed(_))
        ));
    }
}
