//! # rtvi-livekit
//!
//! LiveKit room transport for RTVI voice clients.
//!
//! An RTVI client talks to its bot through a transport. This crate provides
//! one that rides on a LiveKit room: control messages and microphone audio
//! share the room's reliable data channel, and the bot's audio arrives as a
//! subscribed track.
//!
//! ## Architecture
//!
//! ```text
//!   host (RTVI client)
//!        │  RtviTransport
//!        ▼
//! ┌───────────────────────────────────────────────┐
//! │ LiveKitTransport                              │
//! │  TransportState · AudioBuffer · MessageRouter │
//! └───────────────────────┬───────────────────────┘
//!                         │  SessionHandle
//!                         ▼
//!          LiveKitSession (feature "livekit")
//!                         │
//!                         ▼
//!                    LiveKit room
//! ```
//!
//! ## Features
//!
//! - **Lifecycle**: `disconnected → connecting → connected → ready`, with
//!   invalid requests logged and ignored
//! - **Audio buffering**: optionally queue microphone audio until the bot
//!   reports ready, then flush it in order
//! - **Framing**: tagged payloads so audio and control share one channel
//! - **Devices**: enumerate and switch microphones and cameras
//!
//! ## Example
//!
//! ```rust,ignore
//! use rtvi_livekit::livekit::LiveKitSession;
//! use rtvi_livekit::{AuthBundle, ClientOptions, LiveKitTransport, RtviTransport, TransportOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let options = TransportOptions::new().with_buffer_until_bot_ready(true);
//! let mut transport = LiveKitTransport::new(LiveKitSession::new(), options);
//!
//! let (tx, mut messages) = tokio::sync::mpsc::unbounded_channel();
//! transport.initialize(ClientOptions::default(), std::sync::Arc::new(tx)).await;
//! transport.connect(AuthBundle::from_env()?, CancellationToken::new()).await;
//!
//! transport.handle_user_audio_stream(&pcm).await; // queued
//! transport.send_ready_message().await;           // flushed
//! ```

pub mod adapter;
pub mod buffer;
pub mod config;
pub mod devices;
pub mod error;
pub mod message;
pub mod router;
pub mod session;
pub mod state;
pub mod transport;

// Provider implementations
#[cfg(feature = "livekit")]
pub mod livekit;

// Re-exports
pub use adapter::LiveKitTransport;
pub use buffer::{Admission, AudioBuffer, AudioChunk};
pub use config::{AudioCaptureOptions, AuthBundle, ClientOptions, FramingMode, TransportOptions};
#[cfg(feature = "desktop-audio")]
pub use devices::CpalMediaDevices;
pub use devices::{DeviceKind, MediaDeviceInfo, MediaDevices, StaticMediaDevices};
pub use error::{Result, TransportError};
pub use message::{
    FnMessageHandler, InternalMessageType, MessageHandler, NoOpMessageHandler, RtviMessage,
};
pub use router::{DropReason, Inbound, MessageRouter};
pub use session::{
    BoxedSession, DataPublishOptions, LocalTrackRequest, RemoteTrackInfo, SessionConnectionState,
    SessionEvent, SessionEvents, SessionHandle, Subscription, TrackKind, TrackPublicationInfo,
    TrackSource,
};
pub use state::{Transition, TransportState};
pub use transport::{RtviTransport, TrackSet, Tracks};
