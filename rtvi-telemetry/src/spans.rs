//! Span helpers for transport operations
//!
//! Pre-configured spans for the connect, flush and data-channel paths.

use tracing::Span;

/// Create a span covering one connect attempt
///
/// # Arguments
/// * `room_url` - URL of the room being joined
///
/// # Example
/// ```
/// use rtvi_telemetry::connect_span;
/// let span = connect_span("wss://example.livekit.cloud");
/// let _enter = span.enter();
/// ```
pub fn connect_span(room_url: &str) -> Span {
    tracing::info_span!("transport.connect", room.url = room_url, otel.kind = "client")
}

/// Create a span for flushing the buffered audio queue
///
/// # Arguments
/// * `chunks` - Number of queued chunks being flushed
pub fn flush_span(chunks: usize) -> Span {
    tracing::debug_span!("transport.flush", audio.chunks = chunks)
}

/// Create a span for a single data-channel publish
///
/// # Arguments
/// * `kind` - Payload kind ("audio" or "control")
/// * `bytes` - Payload size in bytes
pub fn data_span(kind: &'static str, bytes: usize) -> Span {
    tracing::trace_span!("transport.publish_data", payload.kind = kind, payload.bytes = bytes)
}
