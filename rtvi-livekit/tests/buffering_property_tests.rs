//! Property-based tests for audio ordering and payload classification.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{FakeSession, RecordingHandler};
use proptest::prelude::*;
use rtvi_livekit::router::{AUDIO_TAG, CONTROL_TAG};
use rtvi_livekit::{
    AudioChunk, AuthBundle, ClientOptions, FramingMode, Inbound, LiveKitTransport, MessageRouter,
    RtviMessage, RtviTransport, TransportOptions,
};
use tokio_util::sync::CancellationToken;

fn arb_chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 0..20)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Chunks queued before ready come out in submission order, followed by
    /// chunks submitted after ready, with nothing lost or duplicated.
    #[test]
    fn prop_flush_preserves_submission_order(before in arb_chunks(), after in arb_chunks()) {
        let sent = runtime().block_on(async {
            let session = FakeSession::new();
            let options = TransportOptions::new()
                .with_buffer_until_bot_ready(true)
                .with_framing(FramingMode::Legacy);
            let mut transport = LiveKitTransport::new(session.clone(), options);
            transport
                .initialize(ClientOptions::default(), Arc::new(RecordingHandler::new()))
                .await;
            transport.connect(AuthBundle::new("wss://room", "t"), CancellationToken::new()).await;

            for chunk in &before {
                transport.handle_user_audio_stream(chunk).await;
            }
            transport.send_ready_message().await;
            for chunk in &after {
                transport.handle_user_audio_stream(chunk).await;
            }
            prop_assert_eq!(transport.queued_audio_len(), 0);
            Ok(session.published())
        })?;

        let expected: Vec<Bytes> =
            before.iter().chain(after.iter()).map(|c| Bytes::copy_from_slice(c)).collect();
        prop_assert_eq!(sent, expected);
    }

    /// Tagged audio frames never reach the control path.
    #[test]
    fn prop_tagged_audio_is_never_control(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let router = MessageRouter::new(FramingMode::Tagged);
        let wire = router.encode_audio(&AudioChunk::copy_from_slice(&body));
        prop_assert_eq!(wire[0], AUDIO_TAG);
        prop_assert_eq!(router.classify(wire), Inbound::Audio(Bytes::from(body)));
    }

    /// Control messages survive a tagged encode/classify pass unchanged.
    #[test]
    fn prop_tagged_control_is_delivered(message_type in "[a-z][a-z-]{0,30}", text in ".{0,64}") {
        let router = MessageRouter::new(FramingMode::Tagged);
        let message = RtviMessage::new(message_type, serde_json::json!({ "text": text }));
        let wire = router.encode_control(&message).unwrap();
        prop_assert_eq!(wire[0], CONTROL_TAG);
        prop_assert_eq!(router.classify(wire), Inbound::Control(message));
    }
}
