//! Join a LiveKit room, buffer microphone audio until the bot is ready, and
//! print every control message the bot sends.
//!
//! ```text
//! LIVEKIT_URL=wss://my-project.livekit.cloud \
//! LIVEKIT_API_KEY=... LIVEKIT_API_SECRET=... LIVEKIT_ROOM=demo \
//! cargo run -p rtvi-livekit --example livekit_echo --features livekit
//! ```
//!
//! `LIVEKIT_TOKEN` may be set instead of the API key pair.

use std::sync::Arc;
use std::time::Duration;

use rtvi_livekit::livekit::{AccessToken, LiveKitSession, VideoGrants};
use rtvi_livekit::{
    AuthBundle, ClientOptions, FramingMode, LiveKitTransport, RtviMessage, RtviTransport,
    TransportOptions,
};
use tokio_util::sync::CancellationToken;

/// 20ms of 48kHz mono PCM16 silence.
const SILENCE: [u8; 1920] = [0; 1920];

fn auth_from_env() -> Result<AuthBundle, Box<dyn std::error::Error>> {
    if let Ok(auth) = AuthBundle::from_env() {
        return Ok(auth);
    }
    let url = std::env::var("LIVEKIT_URL")?;
    let key = std::env::var("LIVEKIT_API_KEY")?;
    let secret = std::env::var("LIVEKIT_API_SECRET")?;
    let room = std::env::var("LIVEKIT_ROOM").unwrap_or_else(|_| "rtvi-demo".to_string());

    let token = AccessToken::with_api_key(&key, &secret)
        .with_identity("rtvi-client")
        .with_grants(VideoGrants { room_join: true, room, ..Default::default() })
        .to_jwt()?;
    Ok(AuthBundle::new(url, token))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rtvi_telemetry::init_telemetry("livekit-echo")?;

    let auth = auth_from_env()?;
    let options = TransportOptions::new()
        .with_buffer_until_bot_ready(true)
        .with_framing(FramingMode::Tagged);

    let (playback_tx, mut playback_rx) = tokio::sync::mpsc::unbounded_channel();
    let session = LiveKitSession::new().with_remote_audio_sink(playback_tx);
    let mut transport = LiveKitTransport::new(session, options);

    let (message_tx, mut messages) = tokio::sync::mpsc::unbounded_channel::<RtviMessage>();
    transport.initialize(ClientOptions::default(), Arc::new(message_tx)).await;
    transport.connect(auth, CancellationToken::new()).await;
    println!("Transport state: {}", transport.state());

    // Audio submitted before the bot is ready is queued.
    for _ in 0..10 {
        transport.handle_user_audio_stream(&SILENCE).await;
    }
    println!("Queued chunks: {}", transport.queued_audio_len());

    let mut ticker = tokio::time::interval(Duration::from_millis(20));
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(event) = transport.next_session_event() => {
                transport.handle_session_event(event).await;
            }
            Some(message) = messages.recv() => {
                println!("<- {} ({})", message.message_type, message.label);
                if message.message_type == "bot-ready" {
                    transport.send_ready_message().await;
                    println!("Bot ready; buffered audio flushed");
                }
            }
            Some(track) = playback_rx.recv() => {
                println!("Bot audio track available: {}", track.sid());
            }
            _ = ticker.tick() => {
                transport.handle_user_audio_stream(&SILENCE).await;
            }
            _ = &mut deadline => break,
        }
    }

    transport.disconnect().await;
    println!("Transport state: {}", transport.state());
    Ok(())
}
