//! Configuration types for the transport.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// How payloads on the shared data channel are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Every payload starts with a one-byte type tag (audio or control).
    #[default]
    Tagged,
    /// Untagged payloads: outbound bytes are sent as-is, and inbound
    /// non-empty payloads are assumed to be audio. Peer control messages
    /// cannot be received in this mode.
    Legacy,
}

/// Capture processing requested for the published microphone track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioCaptureOptions {
    /// Acoustic echo cancellation.
    pub echo_cancellation: bool,
    /// Noise suppression.
    pub noise_suppression: bool,
    /// Automatic gain control.
    pub auto_gain_control: bool,
}

impl Default for AudioCaptureOptions {
    fn default() -> Self {
        Self { echo_cancellation: true, noise_suppression: true, auto_gain_control: true }
    }
}

/// Construction-time options. Immutable for the transport's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Queue local audio until the bot signals readiness.
    pub buffer_local_audio_until_bot_ready: bool,

    /// Data-channel framing.
    pub framing: FramingMode,

    /// Processing for the microphone track published on connect.
    pub microphone: AudioCaptureOptions,
}

impl TransportOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue local audio until the bot is ready.
    pub fn with_buffer_until_bot_ready(mut self, enabled: bool) -> Self {
        self.buffer_local_audio_until_bot_ready = enabled;
        self
    }

    /// Set the data-channel framing.
    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    /// Set microphone capture processing.
    pub fn with_microphone(mut self, microphone: AudioCaptureOptions) -> Self {
        self.microphone = microphone;
        self
    }
}

/// Options the host passes to `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Publish the microphone on connect.
    pub enable_mic: bool,
    /// Enable the camera on connect.
    pub enable_cam: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { enable_mic: true, enable_cam: false }
    }
}

/// Room credentials, forwarded verbatim to the session handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthBundle {
    /// Room server URL.
    pub room_url: String,
    /// Access token.
    pub token: String,
}

impl AuthBundle {
    /// Create a bundle from a URL and token.
    pub fn new(room_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { room_url: room_url.into(), token: token.into() }
    }

    /// Read `LIVEKIT_URL` and `LIVEKIT_TOKEN` from the environment.
    pub fn from_env() -> Result<Self> {
        let room_url = std::env::var("LIVEKIT_URL")
            .map_err(|_| TransportError::config("LIVEKIT_URL is not set"))?;
        let token = std::env::var("LIVEKIT_TOKEN")
            .map_err(|_| TransportError::config("LIVEKIT_TOKEN is not set"))?;
        Ok(Self { room_url, token })
    }
}
