//! Boundary with the real-time media provider.
//!
//! The transport never talks to a room directly; it drives a
//! [`SessionHandle`]. The `livekit` feature provides
//! [`LiveKitSession`](crate::livekit::LiveKitSession); tests use recording
//! fakes.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::config::AudioCaptureOptions;
use crate::error::Result;

/// Where a track's media comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Local or remote microphone.
    Microphone,
    /// Camera video.
    Camera,
    /// Screen-share video.
    ScreenShare,
    /// Screen-share audio.
    ScreenShareAudio,
    /// Source not reported by the provider.
    Unknown,
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Microphone => write!(f, "microphone"),
            Self::Camera => write!(f, "camera"),
            Self::ScreenShare => write!(f, "screen_share"),
            Self::ScreenShareAudio => write!(f, "screen_share_audio"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Media kind of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track.
    Audio,
    /// Video track.
    Video,
}

/// Request to capture and publish a local track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrackRequest {
    /// Publication source.
    pub source: TrackSource,
    /// Publication name.
    pub name: String,
    /// Capture device; `None` means the provider default.
    pub device_id: Option<String>,
    /// Processing for audio tracks.
    pub audio: Option<AudioCaptureOptions>,
}

impl LocalTrackRequest {
    /// Microphone track named `microphone`.
    pub fn microphone(options: AudioCaptureOptions) -> Self {
        Self {
            source: TrackSource::Microphone,
            name: "microphone".to_string(),
            device_id: None,
            audio: Some(options),
        }
    }

    /// Camera track named `camera`.
    pub fn camera() -> Self {
        Self { source: TrackSource::Camera, name: "camera".to_string(), device_id: None, audio: None }
    }

    /// Capture from a specific device.
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Media kind implied by the source.
    pub fn kind(&self) -> TrackKind {
        match self.source {
            TrackSource::Microphone | TrackSource::ScreenShareAudio => TrackKind::Audio,
            _ => TrackKind::Video,
        }
    }
}

/// Delivery options for a data publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPublishOptions {
    /// Ordered, guaranteed delivery.
    pub reliable: bool,
}

impl DataPublishOptions {
    /// Ordered, guaranteed delivery.
    pub fn reliable() -> Self {
        Self { reliable: true }
    }

    /// Best-effort delivery.
    pub fn lossy() -> Self {
        Self { reliable: false }
    }
}

/// A track the local participant has published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublicationInfo {
    /// Provider track id.
    pub sid: String,
    /// Publication name.
    pub name: String,
    /// Publication source.
    pub source: TrackSource,
    /// Media kind.
    pub kind: TrackKind,
    /// Whether the publication is muted.
    pub muted: bool,
}

/// A remote track the session has subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrackInfo {
    /// Provider track id.
    pub sid: String,
    /// Media kind.
    pub kind: TrackKind,
    /// Publication source.
    pub source: TrackSource,
    /// Identity of the publishing participant.
    pub participant: String,
}

/// Provider-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionConnectionState {
    /// Signalling link down.
    Disconnected,
    /// Signalling link up.
    Connected,
    /// Provider is resuming a dropped link.
    Reconnecting,
}

/// Notifications from the session after a successful connect.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A remote track became available.
    TrackSubscribed(RemoteTrackInfo),
    /// A remote track went away.
    TrackUnsubscribed(RemoteTrackInfo),
    /// Bytes arrived on the data channel.
    DataReceived {
        /// Raw payload.
        payload: Bytes,
        /// Sending participant, if known.
        sender: Option<String>,
    },
    /// A remote participant joined.
    ParticipantConnected {
        /// Participant identity.
        identity: String,
    },
    /// A remote participant left.
    ParticipantDisconnected {
        /// Participant identity.
        identity: String,
    },
    /// Provider connection state changed.
    ConnectionStateChanged(SessionConnectionState),
}

/// Session notifications the transport listens to once connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Remote track subscribed/unsubscribed.
    RemoteTracks,
    /// Remote data-channel payloads.
    RemoteData,
    /// Participants joining or leaving.
    Participants,
    /// Provider connection-state changes.
    ConnectionState,
}

impl Subscription {
    /// Every subscription, installed together after a successful connect.
    pub const ALL: [Subscription; 4] =
        [Self::RemoteTracks, Self::RemoteData, Self::Participants, Self::ConnectionState];

    /// The subscription an event belongs to.
    pub fn for_event(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::TrackSubscribed(_) | SessionEvent::TrackUnsubscribed(_) => {
                Self::RemoteTracks
            }
            SessionEvent::DataReceived { .. } => Self::RemoteData,
            SessionEvent::ParticipantConnected { .. }
            | SessionEvent::ParticipantDisconnected { .. } => Self::Participants,
            SessionEvent::ConnectionStateChanged(_) => Self::ConnectionState,
        }
    }
}

/// Event stream returned by [`SessionHandle::connect`].
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Opaque room connection owned by the transport.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Join the room. On success, events arrive on the returned stream
    /// until the session is disconnected.
    async fn connect(&mut self, url: &str, token: &str) -> Result<SessionEvents>;

    /// Leave the room and release provider resources.
    async fn disconnect(&mut self) -> Result<()>;

    /// Capture and publish a local track.
    async fn publish_local_track(
        &mut self,
        request: LocalTrackRequest,
    ) -> Result<TrackPublicationInfo>;

    /// Send bytes on the data channel.
    async fn publish_data(&self, payload: Bytes, options: DataPublishOptions) -> Result<()>;

    /// The local publication for `source`, if any.
    fn track_publication(&self, source: TrackSource) -> Option<TrackPublicationInfo>;

    /// Publish (or unmute) / mute the microphone.
    async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Publish (or unmute) / mute the camera.
    async fn set_camera_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Whether an unmuted microphone publication exists.
    fn is_microphone_enabled(&self) -> bool {
        self.track_publication(TrackSource::Microphone).is_some_and(|p| !p.muted)
    }

    /// Whether an unmuted camera publication exists.
    fn is_camera_enabled(&self) -> bool {
        self.track_publication(TrackSource::Camera).is_some_and(|p| !p.muted)
    }

    /// Route a subscribed remote audio track to playback.
    async fn attach_remote_audio(&mut self, _track: &RemoteTrackInfo) -> Result<()> {
        Ok(())
    }
}

/// A boxed session type for dynamic dispatch.
pub type BoxedSession = Box<dyn SessionHandle>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microphone_request() {
        let request = LocalTrackRequest::microphone(AudioCaptureOptions::default());
        assert_eq!(request.source, TrackSource::Microphone);
        assert_eq!(request.name, "microphone");
        assert_eq!(request.kind(), TrackKind::Audio);
        assert!(request.audio.is_some_and(|a| a.echo_cancellation));
    }

    #[test]
    fn test_camera_request_with_device() {
        let request = LocalTrackRequest::camera().with_device("cam-0");
        assert_eq!(request.kind(), TrackKind::Video);
        assert_eq!(request.device_id.as_deref(), Some("cam-0"));
        assert!(request.audio.is_none());
    }

    #[test]
    fn test_data_options() {
        assert!(DataPublishOptions::reliable().reliable);
        assert!(!DataPublishOptions::lossy().reliable);
    }

    #[test]
    fn test_track_source_display() {
        assert_eq!(TrackSource::ScreenShareAudio.to_string(), "screen_share_audio");
        assert_eq!(
            serde_json::to_string(&TrackSource::ScreenShareAudio).unwrap(),
            "\"screen_share_audio\""
        );
    }
}
