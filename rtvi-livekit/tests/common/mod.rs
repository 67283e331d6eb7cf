//! Shared fakes for transport integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rtvi_livekit::{
    DataPublishOptions, LocalTrackRequest, MessageHandler, Result, RtviMessage, SessionEvent,
    SessionEvents, SessionHandle, TrackPublicationInfo, TrackSource, TransportError,
};
use tokio::sync::mpsc;

/// Everything the fake session was asked to do.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub connects: Vec<(String, String)>,
    pub disconnects: usize,
    pub data_attempts: usize,
    pub published: Vec<(Bytes, bool)>,
    pub track_requests: Vec<LocalTrackRequest>,
    pub mic_toggles: Vec<bool>,
    pub cam_toggles: Vec<bool>,
    pub attached: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    log: SessionLog,
    connected: bool,
    fail_connect: bool,
    fail_publish_data: bool,
    fail_publish_track: bool,
    microphone: Option<TrackPublicationInfo>,
    camera: Option<TrackPublicationInfo>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    next_sid: usize,
}

/// In-memory session; clones share state so a test can observe the copy
/// owned by the transport.
#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    inner: Arc<Mutex<Inner>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose `connect` always fails.
    pub fn failing_connect() -> Self {
        let session = Self::new();
        session.inner.lock().fail_connect = true;
        session
    }

    pub fn fail_publish_data(&self, fail: bool) {
        self.inner.lock().fail_publish_data = fail;
    }

    pub fn fail_publish_track(&self, fail: bool) {
        self.inner.lock().fail_publish_track = fail;
    }

    /// Payloads successfully published, in order.
    pub fn published(&self) -> Vec<Bytes> {
        self.inner.lock().log.published.iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn with_log<R>(&self, f: impl FnOnce(&SessionLog) -> R) -> R {
        f(&self.inner.lock().log)
    }

    /// Push an event onto the stream handed out by `connect`.
    pub fn emit(&self, event: SessionEvent) -> bool {
        match self.inner.lock().events.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn publication(inner: &mut Inner, request: &LocalTrackRequest) -> TrackPublicationInfo {
        inner.next_sid += 1;
        TrackPublicationInfo {
            sid: format!("TR_{}", inner.next_sid),
            name: request.name.clone(),
            source: request.source,
            kind: request.kind(),
            muted: false,
        }
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    async fn connect(&mut self, url: &str, token: &str) -> Result<SessionEvents> {
        let mut inner = self.inner.lock();
        inner.log.connects.push((url.to_string(), token.to_string()));
        if inner.fail_connect {
            return Err(TransportError::connection("room unreachable"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        inner.events = Some(tx);
        inner.connected = true;
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.disconnects += 1;
        inner.connected = false;
        inner.events = None;
        inner.microphone = None;
        inner.camera = None;
        Ok(())
    }

    async fn publish_local_track(
        &mut self,
        request: LocalTrackRequest,
    ) -> Result<TrackPublicationInfo> {
        let mut inner = self.inner.lock();
        inner.log.track_requests.push(request.clone());
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if inner.fail_publish_track {
            return Err(TransportError::publish("track rejected"));
        }
        let publication = Self::publication(&mut inner, &request);
        match request.source {
            TrackSource::Microphone => inner.microphone = Some(publication.clone()),
            TrackSource::Camera => inner.camera = Some(publication.clone()),
            _ => {}
        }
        Ok(publication)
    }

    async fn publish_data(&self, payload: Bytes, options: DataPublishOptions) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.data_attempts += 1;
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if inner.fail_publish_data {
            return Err(TransportError::data_channel("channel closed"));
        }
        inner.log.published.push((payload, options.reliable));
        Ok(())
    }

    fn track_publication(&self, source: TrackSource) -> Option<TrackPublicationInfo> {
        let inner = self.inner.lock();
        match source {
            TrackSource::Microphone => inner.microphone.clone(),
            TrackSource::Camera => inner.camera.clone(),
            _ => None,
        }
    }

    async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.mic_toggles.push(enabled);
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        match inner.microphone.as_mut() {
            Some(mic) => mic.muted = !enabled,
            None if enabled => {
                let request = LocalTrackRequest::microphone(Default::default());
                let publication = Self::publication(&mut inner, &request);
                inner.microphone = Some(publication);
            }
            None => {}
        }
        Ok(())
    }

    async fn set_camera_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.cam_toggles.push(enabled);
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        match inner.camera.as_mut() {
            Some(cam) => cam.muted = !enabled,
            None if enabled => {
                let publication = Self::publication(&mut inner, &LocalTrackRequest::camera());
                inner.camera = Some(publication);
            }
            None => {}
        }
        Ok(())
    }

    async fn attach_remote_audio(&mut self, track: &rtvi_livekit::RemoteTrackInfo) -> Result<()> {
        self.inner.lock().log.attached.push(track.sid.clone());
        Ok(())
    }
}

/// Message handler that keeps everything it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    messages: Arc<Mutex<Vec<RtviMessage>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RtviMessage> {
        self.messages.lock().clone()
    }

    /// Types of the internal notifications received, in order.
    pub fn internal_types(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.is_internal())
            .map(|m| m.message_type.clone())
            .collect()
    }
}

impl MessageHandler for RecordingHandler {
    fn on_message(&self, message: RtviMessage) {
        self.messages.lock().push(message);
    }
}
