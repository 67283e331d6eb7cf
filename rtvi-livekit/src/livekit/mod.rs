//! LiveKit room back-end for the transport.
//!
//! [`LiveKitSession`] implements [`SessionHandle`](crate::session::SessionHandle)
//! on top of a [`Room`]. This module also re-exports the subset of
//! [`livekit`] and [`livekit_api`] types a host needs to mint tokens, feed
//! the microphone and camera sources, and play the bot's audio, so
//! downstream crates only need `rtvi-livekit` in their `Cargo.toml`.
//!
//! # Feature flag
//!
//! ```toml
//! [dependencies]
//! rtvi-livekit = { version = "0.1", features = ["livekit"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rtvi_livekit::livekit::{AccessToken, LiveKitSession, VideoGrants};
//!
//! let token = AccessToken::with_api_key(&key, &secret)
//!     .with_identity("client")
//!     .with_grants(VideoGrants { room_join: true, room: "my-room".into(), ..Default::default() })
//!     .to_jwt()?;
//!
//! let (playback_tx, mut playback_rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = LiveKitSession::new().with_remote_audio_sink(playback_tx);
//! ```

mod session;

pub use session::{LiveKitSession, MICROPHONE_QUEUE_MS};

// ── Room ────────────────────────────────────────────────────────────────

pub use livekit::prelude::{ConnectionState, Room, RoomError, RoomEvent, RoomOptions};

// ── Tracks ──────────────────────────────────────────────────────────────

pub use livekit::prelude::{LocalAudioTrack, LocalVideoTrack, RemoteAudioTrack};

// ── Media I/O ───────────────────────────────────────────────────────────

/// A single audio frame (PCM samples + sample rate + channel count).
pub use livekit::webrtc::audio_frame::AudioFrame;

/// Platform-native source backing the published microphone track.
pub use livekit::webrtc::audio_source::native::NativeAudioSource;

/// Host-fed source backing the published camera track.
pub use livekit::webrtc::video_source::native::NativeVideoSource;

/// Frame size for a [`NativeVideoSource`].
pub use livekit::webrtc::video_source::VideoResolution;

// ── Authentication ──────────────────────────────────────────────────────

/// JWT access token for authenticating participants.
pub use livekit_api::access_token::AccessToken;

/// Permission grants embedded in an [`AccessToken`].
pub use livekit_api::access_token::VideoGrants;
