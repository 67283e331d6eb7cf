//! The LiveKit-backed [`RtviTransport`].
//!
//! [`LiveKitTransport`] owns the lifecycle state, the outbound audio queue
//! and the data-channel router, and drives a [`SessionHandle`] for
//! everything that touches the room. Operations take `&mut self`, so a
//! transport is driven from one task; state changes and queue mutations
//! never interleave.
//!
//! # Event loop
//!
//! Session notifications are pulled by the host, typically alongside its
//! own work:
//!
//! ```rust,ignore
//! loop {
//!     tokio::select! {
//!         Some(event) = transport.next_session_event() => {
//!             transport.handle_session_event(event).await;
//!         }
//!         Some(chunk) = mic.recv() => transport.handle_user_audio_stream(&chunk).await,
//!         else => break,
//!     }
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace, warn};

use crate::buffer::{Admission, AudioBuffer};
use crate::config::{AuthBundle, ClientOptions, TransportOptions};
use crate::devices::{DeviceKind, MediaDeviceInfo, MediaDevices, StaticMediaDevices};
use crate::error::{Result, TransportError};
use crate::message::{InternalMessageType, MessageHandler, NoOpMessageHandler, RtviMessage};
use crate::router::{DropReason, Inbound, MessageRouter};
use crate::session::{
    BoxedSession, DataPublishOptions, LocalTrackRequest, RemoteTrackInfo, SessionEvent,
    SessionEvents, SessionHandle, Subscription, TrackKind, TrackSource,
};
use crate::state::{Transition, TransportState};
use crate::transport::{RtviTransport, TrackSet, Tracks};

/// RTVI transport over a LiveKit room.
pub struct LiveKitTransport {
    session: BoxedSession,
    devices: Arc<dyn MediaDevices>,
    options: TransportOptions,
    client_options: ClientOptions,
    handler: Arc<dyn MessageHandler>,
    state: TransportState,
    buffer: AudioBuffer,
    router: MessageRouter,
    events: Option<SessionEvents>,
    subscriptions: HashSet<Subscription>,
    remote_tracks: HashMap<String, RemoteTrackInfo>,
    selected_mic: Option<MediaDeviceInfo>,
    selected_cam: Option<MediaDeviceInfo>,
}

impl LiveKitTransport {
    /// Create a transport over `session`.
    ///
    /// Options are fixed for the transport's lifetime.
    pub fn new(session: impl SessionHandle + 'static, options: TransportOptions) -> Self {
        Self::from_boxed(Box::new(session), options)
    }

    /// Create a transport over an already boxed session.
    pub fn from_boxed(session: BoxedSession, options: TransportOptions) -> Self {
        let buffer = AudioBuffer::new(options.buffer_local_audio_until_bot_ready);
        let router = MessageRouter::new(options.framing);
        Self {
            session,
            devices: Arc::new(StaticMediaDevices::empty()),
            options,
            client_options: ClientOptions::default(),
            handler: Arc::new(NoOpMessageHandler),
            state: TransportState::Disconnected,
            buffer,
            router,
            events: None,
            subscriptions: HashSet::new(),
            remote_tracks: HashMap::new(),
            selected_mic: None,
            selected_cam: None,
        }
    }

    /// Use `devices` for device enumeration.
    pub fn with_devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.devices = devices;
        self
    }

    /// Construction-time options.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Options stored by the last `initialize`.
    pub fn client_options(&self) -> ClientOptions {
        self.client_options
    }

    /// Number of audio chunks waiting for the bot.
    pub fn queued_audio_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether `subscription` is currently installed.
    pub fn is_subscribed(&self, subscription: Subscription) -> bool {
        self.subscriptions.contains(&subscription)
    }

    /// Wait for the next session notification.
    ///
    /// Returns `None` when no session is connected or the provider closed
    /// its event stream.
    pub async fn next_session_event(&mut self) -> Option<SessionEvent> {
        self.events.as_mut()?.recv().await
    }

    /// Handle notifications until the session stream ends.
    pub async fn run_until_closed(&mut self) {
        while let Some(event) = self.next_session_event().await {
            self.handle_session_event(event).await;
        }
        debug!("Session event stream closed");
    }

    /// React to one session notification.
    ///
    /// Events for subscriptions that are not installed are ignored.
    pub async fn handle_session_event(&mut self, event: SessionEvent) {
        if !self.subscriptions.contains(&Subscription::for_event(&event)) {
            debug!(?event, "No subscription installed; ignoring session event");
            return;
        }

        match event {
            SessionEvent::TrackSubscribed(track) => self.on_track_subscribed(track).await,
            SessionEvent::TrackUnsubscribed(track) => {
                debug!(sid = %track.sid, participant = %track.participant, "Remote track unsubscribed");
                self.remote_tracks.remove(&track.sid);
            }
            SessionEvent::DataReceived { payload, sender } => {
                self.on_data_received(payload, sender.as_deref())
            }
            SessionEvent::ParticipantConnected { identity } => {
                info!(participant = %identity, "Participant connected");
            }
            SessionEvent::ParticipantDisconnected { identity } => {
                info!(participant = %identity, "Participant disconnected");
            }
            SessionEvent::ConnectionStateChanged(state) => {
                info!(?state, "Room connection state changed");
            }
        }
    }

    async fn on_track_subscribed(&mut self, track: RemoteTrackInfo) {
        if track.kind == TrackKind::Audio {
            match self.session.attach_remote_audio(&track).await {
                Ok(()) => info!(participant = %track.participant, sid = %track.sid, "Attached remote audio track"),
                Err(e) => warn!(error = %e, sid = %track.sid, "Failed to attach remote audio track"),
            }
        } else {
            debug!(sid = %track.sid, source = %track.source, "Remote video track subscribed");
        }
        self.remote_tracks.insert(track.sid.clone(), track);
    }

    fn on_data_received(&self, payload: Bytes, sender: Option<&str>) {
        match self.router.classify(payload) {
            Inbound::Control(message) => {
                debug!(message_type = %message.message_type, sender, "Received control message");
                self.handler.on_message(message);
            }
            Inbound::Audio(bytes) => {
                debug!(bytes = bytes.len(), sender, "Discarding inbound audio payload");
            }
            Inbound::Dropped(DropReason::Malformed(reason)) => {
                error!(error = %reason, sender, "Failed to parse data message");
            }
            Inbound::Dropped(reason) => {
                warn!(?reason, sender, "Dropping data message");
            }
        }
    }

    fn transition(&mut self, transition: Transition) -> bool {
        match self.state.apply(transition) {
            Ok(next) => {
                debug!(from = %self.state, to = %next, "Transport state changed");
                self.state = next;
                true
            }
            Err(e) => {
                warn!(error = %e, "Ignoring request");
                false
            }
        }
    }

    fn emit_internal(&self, kind: InternalMessageType) {
        self.handler.on_message(RtviMessage::internal(kind));
    }

    async fn publish(&self, payload: Bytes, kind: &'static str) -> Result<()> {
        let span = rtvi_telemetry::data_span(kind, payload.len());
        self.session.publish_data(payload, DataPublishOptions::reliable()).instrument(span).await
    }

    async fn send_audio(&self, payload: Bytes) {
        if let Err(e) = self.publish(payload, "audio").await {
            warn!(error = %e, "Failed to send audio chunk");
        }
    }

    async fn flush_audio(&mut self) {
        let batch = self.buffer.drain();
        if batch.is_empty() {
            return;
        }
        let span = rtvi_telemetry::flush_span(batch.len());
        async {
            for chunk in &batch {
                let payload = self.router.encode_audio(chunk);
                self.send_audio(payload).await;
            }
            debug!(chunks = batch.len(), "Flushed buffered audio");
        }
        .instrument(span)
        .await
    }

    fn discard_queued_audio(&mut self) {
        let dropped = self.buffer.clear();
        if dropped > 0 {
            debug!(chunks = dropped, "Discarded buffered audio");
            self.emit_internal(InternalMessageType::AudioBufferingStopped);
        }
    }

    async fn publish_microphone(&mut self, device_id: Option<&str>) -> Result<()> {
        let mut request = LocalTrackRequest::microphone(self.options.microphone);
        if let Some(id) = device_id {
            request = request.with_device(id);
        }
        let publication = self.session.publish_local_track(request).await?;
        info!(sid = %publication.sid, "Published microphone track");
        Ok(())
    }

    async fn open_session(&mut self, auth: &AuthBundle) {
        debug!("Connecting to room");
        let events = match self.session.connect(&auth.room_url, &auth.token).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Failed to connect to room");
                self.transition(Transition::SessionFailed);
                return;
            }
        };
        self.transition(Transition::SessionEstablished);
        info!("Connected to room");

        if self.client_options.enable_mic {
            if let Err(e) = self.publish_microphone(None).await {
                error!(error = %e, "Failed to publish microphone track");
            }
        }
        if self.client_options.enable_cam {
            if let Err(e) = self.session.set_camera_enabled(true).await {
                error!(error = %e, "Failed to enable camera");
            }
        }

        self.events = Some(events);
        self.subscriptions.extend(Subscription::ALL);
        debug!(count = self.subscriptions.len(), "Installed session subscriptions");
    }

    async fn list_devices(&self, kind: DeviceKind) -> Vec<MediaDeviceInfo> {
        match self.devices.devices_of_kind(kind).await {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, ?kind, "Failed to enumerate devices");
                Vec::new()
            }
        }
    }

    async fn resolve_device(&self, kind: DeviceKind, device_id: &str) -> MediaDeviceInfo {
        self.list_devices(kind)
            .await
            .into_iter()
            .find(|d| d.device_id == device_id)
            .unwrap_or_else(|| MediaDeviceInfo::new(device_id, kind, ""))
    }
}

fn slot<T>(set: &mut TrackSet<T>, source: TrackSource, kind: TrackKind) -> &mut Option<T> {
    match (source, kind) {
        (TrackSource::ScreenShare, _) => &mut set.screen_video,
        (TrackSource::ScreenShareAudio, _) => &mut set.screen_audio,
        (_, TrackKind::Audio) => &mut set.audio,
        (_, TrackKind::Video) => &mut set.video,
    }
}

#[async_trait]
impl RtviTransport for LiveKitTransport {
    async fn initialize(&mut self, options: ClientOptions, handler: Arc<dyn MessageHandler>) {
        debug!(?options, "Initializing transport");
        self.client_options = options;
        self.handler = handler;
    }

    async fn connect(&mut self, auth: AuthBundle, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            debug!("Connect cancelled before start");
            return;
        }
        if !self.transition(Transition::ConnectRequested) {
            return;
        }
        let span = rtvi_telemetry::connect_span(&auth.room_url);
        self.open_session(&auth).instrument(span).await;
    }

    async fn disconnect(&mut self) {
        if self.state == TransportState::Disconnected {
            debug!("Already disconnected");
            return;
        }
        if let Err(e) = self.session.disconnect().await {
            warn!(error = %e, "Session disconnect failed");
        }
        self.transition(Transition::DisconnectRequested);
        self.events = None;
        self.subscriptions.clear();
        self.remote_tracks.clear();
        self.discard_queued_audio();
        info!("Disconnected from room");
    }

    async fn send_message(&mut self, message: RtviMessage) {
        let payload = match self.router.encode_control(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, message_id = %message.id, "Failed to encode message");
                return;
            }
        };
        if let Err(e) = self.publish(payload, "control").await {
            error!(error = %e, message_id = %message.id, "Failed to send message");
        }
    }

    async fn send_ready_message(&mut self) {
        if self.state.is_ready() {
            debug!("Bot already ready");
            return;
        }
        if !self.transition(Transition::BotReady) {
            return;
        }
        self.flush_audio().await;
        self.emit_internal(InternalMessageType::AudioBufferingStopped);
    }

    async fn handle_user_audio_stream(&mut self, data: &[u8]) {
        if !self.session.is_microphone_enabled() {
            info!("Microphone is disabled; enabling it");
            self.enable_mic(true).await;
        }

        match self.buffer.admit(data, self.state) {
            Admission::Queued { position } => {
                trace!(position, state = %self.state, "Buffered audio until bot ready");
                self.emit_internal(InternalMessageType::AudioBufferingStarted);
            }
            Admission::SendNow(chunk) => {
                let payload = self.router.encode_audio(&chunk);
                self.send_audio(payload).await;
                self.discard_queued_audio();
            }
        }
    }

    fn state(&self) -> TransportState {
        self.state
    }

    async fn get_all_mics(&self) -> Vec<MediaDeviceInfo> {
        self.list_devices(DeviceKind::AudioInput).await
    }

    async fn get_all_cams(&self) -> Vec<MediaDeviceInfo> {
        self.list_devices(DeviceKind::VideoInput).await
    }

    async fn get_all_speakers(&self) -> Vec<MediaDeviceInfo> {
        self.list_devices(DeviceKind::AudioOutput).await
    }

    async fn update_mic(&mut self, device_id: &str) {
        match self.publish_microphone(Some(device_id)).await {
            Ok(()) => {
                self.selected_mic = Some(self.resolve_device(DeviceKind::AudioInput, device_id).await);
            }
            Err(e) => error!(error = %e, device_id, "Failed to switch microphone"),
        }
    }

    async fn update_cam(&mut self, device_id: &str) {
        let request = LocalTrackRequest::camera().with_device(device_id);
        match self.session.publish_local_track(request).await {
            Ok(publication) => {
                info!(sid = %publication.sid, device_id, "Published camera track");
                self.selected_cam = Some(self.resolve_device(DeviceKind::VideoInput, device_id).await);
            }
            Err(e) => error!(error = %e, device_id, "Failed to switch camera"),
        }
    }

    fn update_speaker(&mut self, speaker_id: &str) -> Result<()> {
        warn!(speaker_id, "Speaker selection is not supported");
        Err(TransportError::unsupported("speaker selection"))
    }

    fn selected_mic(&self) -> Option<&MediaDeviceInfo> {
        self.selected_mic.as_ref()
    }

    fn selected_cam(&self) -> Option<&MediaDeviceInfo> {
        self.selected_cam.as_ref()
    }

    fn selected_speaker(&self) -> Option<&MediaDeviceInfo> {
        None
    }

    async fn enable_mic(&mut self, enable: bool) {
        match self.session.set_microphone_enabled(enable).await {
            Ok(()) => info!(enabled = enable, "Microphone toggled"),
            Err(e) => error!(error = %e, enabled = enable, "Failed to toggle microphone"),
        }
    }

    async fn enable_cam(&mut self, enable: bool) {
        match self.session.set_camera_enabled(enable).await {
            Ok(()) => info!(enabled = enable, "Camera toggled"),
            Err(e) => error!(error = %e, enabled = enable, "Failed to toggle camera"),
        }
    }

    fn enable_screen_share(&mut self, enable: bool) -> Result<()> {
        warn!(enabled = enable, "Screen sharing is not supported");
        Err(TransportError::unsupported("screen sharing"))
    }

    fn is_mic_enabled(&self) -> bool {
        self.session.is_microphone_enabled()
    }

    fn is_cam_enabled(&self) -> bool {
        self.session.is_camera_enabled()
    }

    fn is_sharing_screen(&self) -> bool {
        false
    }

    fn tracks(&self) -> Tracks {
        let mut local = TrackSet::default();
        for source in [
            TrackSource::Microphone,
            TrackSource::Camera,
            TrackSource::ScreenShare,
            TrackSource::ScreenShareAudio,
        ] {
            if let Some(publication) = self.session.track_publication(source) {
                let kind = publication.kind;
                *slot(&mut local, source, kind) = Some(publication);
            }
        }

        let mut bot = TrackSet::default();
        for track in self.remote_tracks.values() {
            slot(&mut bot, track.source, track.kind).get_or_insert_with(|| track.clone());
        }

        Tracks { local, bot: (!bot.is_empty()).then_some(bot) }
    }
}
