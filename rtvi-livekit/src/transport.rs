//! Host-facing transport contract.
//!
//! An RTVI client drives exactly one [`RtviTransport`]. Every operation is
//! best-effort: lower-level failures are logged and absorbed, so a host
//! never has to unwind a half-finished connect or publish. The only
//! operations that report an error are the ones this transport refuses
//! outright ([`RtviTransport::update_speaker`] and
//! [`RtviTransport::enable_screen_share`]).

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{AuthBundle, ClientOptions};
use crate::devices::MediaDeviceInfo;
use crate::error::Result;
use crate::message::{MessageHandler, RtviMessage};
use crate::session::{RemoteTrackInfo, TrackPublicationInfo};
use crate::state::TransportState;

/// One slot per media role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSet<T> {
    /// Audio track.
    pub audio: Option<T>,
    /// Video track.
    pub video: Option<T>,
    /// Screen-share audio track.
    pub screen_audio: Option<T>,
    /// Screen-share video track.
    pub screen_video: Option<T>,
}

impl<T> Default for TrackSet<T> {
    fn default() -> Self {
        Self { audio: None, video: None, screen_audio: None, screen_video: None }
    }
}

impl<T> TrackSet<T> {
    /// Whether every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.video.is_none()
            && self.screen_audio.is_none()
            && self.screen_video.is_none()
    }
}

/// Snapshot of local and bot tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tracks {
    /// Tracks the local participant publishes.
    pub local: TrackSet<TrackPublicationInfo>,
    /// Tracks received from the bot; `None` until one is subscribed.
    pub bot: Option<TrackSet<RemoteTrackInfo>>,
}

/// The contract an RTVI client uses to talk to its bot.
#[async_trait]
pub trait RtviTransport: Send + Sync {
    /// Store the client options and the message callback.
    ///
    /// Takes effect for messages delivered after the call returns.
    async fn initialize(&mut self, options: ClientOptions, handler: Arc<dyn MessageHandler>);

    /// Join the room described by `auth`.
    ///
    /// A token that is already cancelled aborts before any state change.
    /// Cancelling mid-flight is not observed.
    async fn connect(&mut self, auth: AuthBundle, cancel: CancellationToken);

    /// Leave the room. No effect when already disconnected.
    async fn disconnect(&mut self);

    /// Serialize `message` and publish it reliably.
    async fn send_message(&mut self, message: RtviMessage);

    /// Mark the bot ready and flush any buffered audio.
    async fn send_ready_message(&mut self);

    /// Submit one chunk of locally captured audio.
    ///
    /// The bytes are copied before this returns.
    async fn handle_user_audio_stream(&mut self, data: &[u8]);

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// Available microphones.
    async fn get_all_mics(&self) -> Vec<MediaDeviceInfo>;

    /// Available cameras.
    async fn get_all_cams(&self) -> Vec<MediaDeviceInfo>;

    /// Available speakers.
    async fn get_all_speakers(&self) -> Vec<MediaDeviceInfo>;

    /// Switch the published microphone to `device_id`.
    async fn update_mic(&mut self, device_id: &str);

    /// Switch the published camera to `device_id`.
    async fn update_cam(&mut self, device_id: &str);

    /// Select a playback device.
    fn update_speaker(&mut self, speaker_id: &str) -> Result<()>;

    /// The last microphone successfully selected.
    fn selected_mic(&self) -> Option<&MediaDeviceInfo>;

    /// The last camera successfully selected.
    fn selected_cam(&self) -> Option<&MediaDeviceInfo>;

    /// The selected playback device.
    fn selected_speaker(&self) -> Option<&MediaDeviceInfo>;

    /// Publish/unmute or mute the microphone.
    async fn enable_mic(&mut self, enable: bool);

    /// Publish/unmute or mute the camera.
    async fn enable_cam(&mut self, enable: bool);

    /// Start or stop screen sharing.
    fn enable_screen_share(&mut self, enable: bool) -> Result<()>;

    /// Whether the microphone is live.
    fn is_mic_enabled(&self) -> bool;

    /// Whether the camera is live.
    fn is_cam_enabled(&self) -> bool;

    /// Whether the screen is being shared.
    fn is_sharing_screen(&self) -> bool;

    /// Current local and bot tracks.
    fn tracks(&self) -> Tracks;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_set_default_is_empty() {
        let set: TrackSet<RemoteTrackInfo> = TrackSet::default();
        assert!(set.is_empty());
        assert_eq!(Tracks::default().bot, None);
    }
}
