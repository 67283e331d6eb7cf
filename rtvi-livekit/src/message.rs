//! Control messages exchanged with the host and the bot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// Label carried by messages the adapter synthesizes itself.
pub const INTERNAL_LABEL: &str = "internal";

/// Label used for messages created through [`RtviMessage::new`].
pub const RTVI_LABEL: &str = "rtvi-ai";

/// A control message: `{id, label, type, data}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtviMessage {
    /// Correlation id.
    pub id: String,
    /// Origin marker; [`INTERNAL_LABEL`] for adapter-generated events.
    pub label: String,
    /// Message type.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Message payload.
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl RtviMessage {
    /// Create an application message with a fresh UUID.
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: RTVI_LABEL.to_string(),
            message_type: message_type.into(),
            data,
        }
    }

    /// Create an adapter-internal notification.
    ///
    /// The id combines the event type with the current Unix time in
    /// milliseconds, e.g. `audio-buffering-started-1718000000000`.
    pub fn internal(kind: InternalMessageType) -> Self {
        Self {
            id: format!("{}-{}", kind, chrono::Utc::now().timestamp_millis()),
            label: INTERNAL_LABEL.to_string(),
            message_type: kind.to_string(),
            data: empty_object(),
        }
    }

    /// Whether the adapter produced this message.
    pub fn is_internal(&self) -> bool {
        self.label == INTERNAL_LABEL
    }

    /// Parse the message type as an internal event, if it is one.
    pub fn internal_type(&self) -> Option<InternalMessageType> {
        if !self.is_internal() {
            return None;
        }
        match self.message_type.as_str() {
            "audio-buffering-started" => Some(InternalMessageType::AudioBufferingStarted),
            "audio-buffering-stopped" => Some(InternalMessageType::AudioBufferingStopped),
            _ => None,
        }
    }
}

/// Events the adapter reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InternalMessageType {
    /// A chunk was queued because the bot is not ready.
    AudioBufferingStarted,
    /// The queue was flushed or discarded.
    AudioBufferingStopped,
}

impl fmt::Display for InternalMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioBufferingStarted => write!(f, "audio-buffering-started"),
            Self::AudioBufferingStopped => write!(f, "audio-buffering-stopped"),
        }
    }
}

/// Receives every message the transport delivers to the host.
///
/// Called on the transport's event loop, so implementations must not block.
pub trait MessageHandler: Send + Sync {
    /// Called once per delivered message.
    fn on_message(&self, message: RtviMessage);
}

/// Default handler used before `initialize`; drops everything.
#[derive(Debug, Clone, Default)]
pub struct NoOpMessageHandler;

impl MessageHandler for NoOpMessageHandler {
    fn on_message(&self, _message: RtviMessage) {}
}

/// Single-subscriber channel: messages are forwarded to the receiver half.
impl MessageHandler for mpsc::UnboundedSender<RtviMessage> {
    fn on_message(&self, message: RtviMessage) {
        if let Err(e) = self.send(message) {
            tracing::debug!(message_id = %e.0.id, "Message receiver dropped; discarding message");
        }
    }
}

/// A plain function or closure as handler.
pub struct FnMessageHandler<F>
where
    F: Fn(RtviMessage) + Send + Sync,
{
    handler: F,
}

impl<F> FnMessageHandler<F>
where
    F: Fn(RtviMessage) + Send + Sync,
{
    /// Create a new function-based message handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> MessageHandler for FnMessageHandler<F>
where
    F: Fn(RtviMessage) + Send + Sync,
{
    fn on_message(&self, message: RtviMessage) {
        (self.handler)(message)
    }
}
