//! [`SessionHandle`] backed by a LiveKit [`Room`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use livekit::options::TrackPublishOptions;
use livekit::prelude as lk;
use livekit::prelude::{
    DataPacket, LocalAudioTrack, LocalTrack, LocalTrackPublication, LocalVideoTrack,
    RemoteAudioTrack, Room, RoomEvent, RoomOptions,
};
use livekit::webrtc::audio_frame::AudioFrame;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource};
use livekit::webrtc::video_source::RtcVideoSource;
use livekit::webrtc::video_source::native::NativeVideoSource;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AudioCaptureOptions;
use crate::error::{Result, TransportError};
use crate::session::{
    DataPublishOptions, LocalTrackRequest, RemoteTrackInfo, SessionConnectionState,
    SessionEvent, SessionEvents, SessionHandle, TrackKind, TrackPublicationInfo, TrackSource,
};

/// Default microphone sample rate (48kHz).
const DEFAULT_SAMPLE_RATE: u32 = 48000;
/// Default number of microphone channels (mono).
const DEFAULT_NUM_CHANNELS: u32 = 1;
/// Buffering inside the microphone's [`NativeAudioSource`].
pub const MICROPHONE_QUEUE_MS: u32 = 100;

type RemoteAudioMap = Arc<Mutex<HashMap<String, RemoteAudioTrack>>>;

struct Microphone {
    publication: LocalTrackPublication,
    source: NativeAudioSource,
}

/// A LiveKit room connection.
///
/// The Rust SDK has no capture devices of its own: the host pushes PCM into
/// the microphone with [`capture_microphone`](Self::capture_microphone) and
/// video frames into the [`NativeVideoSource`] given to
/// [`with_camera_source`](Self::with_camera_source). Subscribed remote audio
/// tracks are handed to the sink set with
/// [`with_remote_audio_sink`](Self::with_remote_audio_sink) for playback.
pub struct LiveKitSession {
    room_options: RoomOptions,
    sample_rate: u32,
    num_channels: u32,
    room: Option<Room>,
    forwarder: Option<JoinHandle<()>>,
    microphone: Option<Microphone>,
    microphone_options: AudioCaptureOptions,
    camera: Option<LocalTrackPublication>,
    camera_source: Option<NativeVideoSource>,
    remote_audio: RemoteAudioMap,
    remote_audio_sink: Option<mpsc::UnboundedSender<RemoteAudioTrack>>,
}

impl Default for LiveKitSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveKitSession {
    /// Create a disconnected session with default room options.
    pub fn new() -> Self {
        Self {
            room_options: RoomOptions::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            num_channels: DEFAULT_NUM_CHANNELS,
            room: None,
            forwarder: None,
            microphone: None,
            microphone_options: AudioCaptureOptions::default(),
            camera: None,
            camera_source: None,
            remote_audio: Arc::new(Mutex::new(HashMap::new())),
            remote_audio_sink: None,
        }
    }

    /// Room options used on connect.
    pub fn with_room_options(mut self, options: RoomOptions) -> Self {
        self.room_options = options;
        self
    }

    /// Microphone sample rate and channel count.
    pub fn with_microphone_format(mut self, sample_rate: u32, num_channels: u32) -> Self {
        self.sample_rate = sample_rate;
        self.num_channels = num_channels.max(1);
        self
    }

    /// Video source published when the camera is enabled.
    pub fn with_camera_source(mut self, source: NativeVideoSource) -> Self {
        self.camera_source = Some(source);
        self
    }

    /// Where subscribed remote audio tracks are sent for playback.
    pub fn with_remote_audio_sink(mut self, sink: mpsc::UnboundedSender<RemoteAudioTrack>) -> Self {
        self.remote_audio_sink = Some(sink);
        self
    }

    /// The connected room, if any.
    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Push little-endian PCM16 into the published microphone track.
    ///
    /// A trailing odd byte is ignored.
    pub async fn capture_microphone(&self, pcm: &[u8]) -> Result<()> {
        let Some(microphone) = self.microphone.as_ref() else {
            return Err(TransportError::device("microphone is not published"));
        };
        let pcm = &pcm[..pcm.len() & !1];
        let samples: Cow<'_, [i16]> = match bytemuck::try_cast_slice(pcm) {
            Ok(samples) => Cow::Borrowed(samples),
            Err(_) => Cow::Owned(
                pcm.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect(),
            ),
        };
        let samples_per_channel = samples.len() as u32 / self.num_channels;
        let frame = AudioFrame {
            data: samples,
            sample_rate: self.sample_rate,
            num_channels: self.num_channels,
            samples_per_channel,
        };
        microphone
            .source
            .capture_frame(&frame)
            .await
            .map_err(|e| TransportError::device(e.to_string()))
    }

    fn connected_room(&self) -> Result<&Room> {
        self.room.as_ref().ok_or(TransportError::NotConnected)
    }

    async fn publish_microphone(
        &mut self,
        name: &str,
        options: AudioCaptureOptions,
    ) -> Result<TrackPublicationInfo> {
        let source = NativeAudioSource::new(
            AudioSourceOptions {
                echo_cancellation: options.echo_cancellation,
                noise_suppression: options.noise_suppression,
                auto_gain_control: options.auto_gain_control,
            },
            self.sample_rate,
            self.num_channels,
            MICROPHONE_QUEUE_MS,
        );
        let track = LocalAudioTrack::create_audio_track(name, RtcAudioSource::Native(source.clone()));
        let publish_options =
            TrackPublishOptions { source: lk::TrackSource::Microphone, ..Default::default() };

        let room = self.room.as_ref().ok_or(TransportError::NotConnected)?;
        if let Some(previous) = self.microphone.as_ref() {
            let sid = previous.publication.sid();
            if let Err(e) = room.local_participant().unpublish_track(&sid).await {
                tracing::warn!(error = %e, "Failed to unpublish previous microphone track");
            }
        }
        let publication = room
            .local_participant()
            .publish_track(LocalTrack::Audio(track), publish_options)
            .await
            .map_err(|e| TransportError::publish(e.to_string()))?;

        let info = publication_info(&publication, TrackSource::Microphone);
        self.microphone = Some(Microphone { publication, source });
        self.microphone_options = options;
        Ok(info)
    }

    async fn publish_camera(&mut self, name: &str) -> Result<TrackPublicationInfo> {
        let Some(source) = self.camera_source.clone() else {
            return Err(TransportError::device("no camera source configured"));
        };
        let track = LocalVideoTrack::create_video_track(name, RtcVideoSource::Native(source));
        let publish_options =
            TrackPublishOptions { source: lk::TrackSource::Camera, ..Default::default() };

        let room = self.room.as_ref().ok_or(TransportError::NotConnected)?;
        if let Some(previous) = self.camera.as_ref() {
            if let Err(e) = room.local_participant().unpublish_track(&previous.sid()).await {
                tracing::warn!(error = %e, "Failed to unpublish previous camera track");
            }
        }
        let publication = room
            .local_participant()
            .publish_track(LocalTrack::Video(track), publish_options)
            .await
            .map_err(|e| TransportError::publish(e.to_string()))?;

        let info = publication_info(&publication, TrackSource::Camera);
        self.camera = Some(publication);
        Ok(info)
    }
}

fn publication_info(publication: &LocalTrackPublication, source: TrackSource) -> TrackPublicationInfo {
    TrackPublicationInfo {
        sid: publication.sid().to_string(),
        name: publication.name(),
        source,
        kind: track_kind(publication.kind()),
        muted: publication.is_muted(),
    }
}

fn track_kind(kind: lk::TrackKind) -> TrackKind {
    match kind {
        lk::TrackKind::Audio => TrackKind::Audio,
        lk::TrackKind::Video => TrackKind::Video,
    }
}

fn track_source(source: lk::TrackSource) -> TrackSource {
    match source {
        lk::TrackSource::Microphone => TrackSource::Microphone,
        lk::TrackSource::Camera => TrackSource::Camera,
        lk::TrackSource::Screenshare => TrackSource::ScreenShare,
        lk::TrackSource::ScreenshareAudio => TrackSource::ScreenShareAudio,
        lk::TrackSource::Unknown => TrackSource::Unknown,
    }
}

fn connection_state(state: lk::ConnectionState) -> SessionConnectionState {
    match state {
        lk::ConnectionState::Connected => SessionConnectionState::Connected,
        lk::ConnectionState::Reconnecting => SessionConnectionState::Reconnecting,
        _ => SessionConnectionState::Disconnected,
    }
}

/// Translate a room event, remembering remote audio tracks for playback.
fn translate(event: RoomEvent, remote_audio: &RemoteAudioMap) -> Option<SessionEvent> {
    match event {
        RoomEvent::TrackSubscribed { track, publication, participant } => {
            let info = RemoteTrackInfo {
                sid: track.sid().to_string(),
                kind: track_kind(publication.kind()),
                source: track_source(publication.source()),
                participant: participant.identity().to_string(),
            };
            if let lk::RemoteTrack::Audio(audio) = track {
                remote_audio.lock().insert(info.sid.clone(), audio);
            }
            Some(SessionEvent::TrackSubscribed(info))
        }
        RoomEvent::TrackUnsubscribed { track, publication, participant } => {
            let sid = track.sid().to_string();
            remote_audio.lock().remove(&sid);
            Some(SessionEvent::TrackUnsubscribed(RemoteTrackInfo {
                sid,
                kind: track_kind(publication.kind()),
                source: track_source(publication.source()),
                participant: participant.identity().to_string(),
            }))
        }
        RoomEvent::DataReceived { payload, participant, .. } => Some(SessionEvent::DataReceived {
            payload: Bytes::copy_from_slice(&payload),
            sender: participant.map(|p| p.identity().to_string()),
        }),
        RoomEvent::ParticipantConnected(participant) => Some(SessionEvent::ParticipantConnected {
            identity: participant.identity().to_string(),
        }),
        RoomEvent::ParticipantDisconnected(participant) => {
            Some(SessionEvent::ParticipantDisconnected {
                identity: participant.identity().to_string(),
            })
        }
        RoomEvent::ConnectionStateChanged(state) => {
            Some(SessionEvent::ConnectionStateChanged(connection_state(state)))
        }
        _ => None,
    }
}

#[async_trait]
impl SessionHandle for LiveKitSession {
    async fn connect(&mut self, url: &str, token: &str) -> Result<SessionEvents> {
        if self.room.is_some() {
            return Err(TransportError::connection("session already connected"));
        }
        let (room, mut room_events) = Room::connect(url, token, self.room_options.clone())
            .await
            .map_err(|e| TransportError::connection(e.to_string()))?;
        tracing::info!(room = %room.name(), "Joined LiveKit room");

        let (tx, rx) = mpsc::unbounded_channel();
        let remote_audio = Arc::clone(&self.remote_audio);
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(event) = room_events.recv().await {
                let Some(event) = translate(event, &remote_audio) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            tracing::debug!("Room event stream ended");
        }));
        self.room = Some(room);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        self.microphone = None;
        self.camera = None;
        self.remote_audio.lock().clear();
        match self.room.take() {
            Some(room) => room.close().await.map_err(|e| TransportError::connection(e.to_string())),
            None => Ok(()),
        }
    }

    async fn publish_local_track(
        &mut self,
        request: LocalTrackRequest,
    ) -> Result<TrackPublicationInfo> {
        if let Some(device_id) = request.device_id.as_deref() {
            tracing::debug!(device_id, source = %request.source, "Capture device is fed by the host");
        }
        match request.source {
            TrackSource::Microphone => {
                let options = request.audio.unwrap_or(self.microphone_options);
                self.publish_microphone(&request.name, options).await
            }
            TrackSource::Camera => self.publish_camera(&request.name).await,
            other => Err(TransportError::unsupported(format!("publishing {other} tracks"))),
        }
    }

    async fn publish_data(&self, payload: Bytes, options: DataPublishOptions) -> Result<()> {
        let room = self.connected_room()?;
        let packet =
            DataPacket { payload: payload.to_vec(), reliable: options.reliable, ..Default::default() };
        room.local_participant()
            .publish_data(packet)
            .await
            .map_err(|e| TransportError::data_channel(e.to_string()))
    }

    fn track_publication(&self, source: TrackSource) -> Option<TrackPublicationInfo> {
        match source {
            TrackSource::Microphone => {
                self.microphone.as_ref().map(|m| publication_info(&m.publication, source))
            }
            TrackSource::Camera => self.camera.as_ref().map(|p| publication_info(p, source)),
            _ => None,
        }
    }

    async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<()> {
        match (self.microphone.as_ref(), enabled) {
            (Some(microphone), true) => microphone.publication.unmute(),
            (Some(microphone), false) => microphone.publication.mute(),
            (None, true) => {
                let options = self.microphone_options;
                self.publish_microphone("microphone", options).await?;
            }
            (None, false) => {}
        }
        Ok(())
    }

    async fn set_camera_enabled(&mut self, enabled: bool) -> Result<()> {
        match (self.camera.as_ref(), enabled) {
            (Some(camera), true) => camera.unmute(),
            (Some(camera), false) => camera.mute(),
            (None, true) => {
                self.publish_camera("camera").await?;
            }
            (None, false) => {}
        }
        Ok(())
    }

    async fn attach_remote_audio(&mut self, track: &RemoteTrackInfo) -> Result<()> {
        let Some(sink) = self.remote_audio_sink.as_ref() else {
            tracing::debug!(sid = %track.sid, "No remote audio sink configured");
            return Ok(());
        };
        let audio = self.remote_audio.lock().get(&track.sid).cloned();
        match audio {
            Some(audio) => sink
                .send(audio)
                .map_err(|_| TransportError::provider("remote audio sink closed")),
            None => Err(TransportError::provider(format!("unknown remote track {}", track.sid))),
        }
    }
}

impl Drop for LiveKitSession {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mapping() {
        assert_eq!(track_source(lk::TrackSource::Screenshare), TrackSource::ScreenShare);
        assert_eq!(track_source(lk::TrackSource::ScreenshareAudio), TrackSource::ScreenShareAudio);
        assert_eq!(track_source(lk::TrackSource::Microphone), TrackSource::Microphone);
        assert_eq!(track_kind(lk::TrackKind::Video), TrackKind::Video);
    }

    #[test]
    fn test_connection_state_mapping() {
        assert_eq!(
            connection_state(lk::ConnectionState::Reconnecting),
            SessionConnectionState::Reconnecting
        );
        assert_eq!(
            connection_state(lk::ConnectionState::Disconnected),
            SessionConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_disconnected_session_rejects_io() {
        let mut session = LiveKitSession::new();
        assert!(matches!(
            session.publish_data(Bytes::from_static(b"x"), DataPublishOptions::reliable()).await,
            Err(TransportError::NotConnected)
        ));
        assert!(session.capture_microphone(&[0, 0]).await.is_err());
        assert!(session.disconnect().await.is_ok());
        assert!(!session.is_microphone_enabled());
    }

    #[tokio::test]
    async fn test_camera_requires_source() {
        let mut session = LiveKitSession::new();
        let err = session.publish_local_track(LocalTrackRequest::camera()).await.unwrap_err();
        assert!(matches!(err, TransportError::DeviceError(_)));
    }
}
