//! Outbound audio buffering until the bot is ready.

use bytes::Bytes;
use std::collections::VecDeque;

use crate::state::TransportState;

/// One unit of locally captured audio.
///
/// Always a private copy of the caller's buffer, so callers may reuse
/// their capture buffers as soon as the submit call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: Bytes,
}

impl AudioChunk {
    /// Copy `data` into a new chunk.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self { data: Bytes::copy_from_slice(data) }
    }

    /// The audio bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the chunk, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk holds no audio.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the buffer decided for a submitted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The chunk was appended to the queue; `position` is its 1-based index.
    Queued {
        /// Queue length after the append.
        position: usize,
    },
    /// The chunk must be sent right away.
    SendNow(AudioChunk),
}

/// FIFO queue that holds audio while the bot is not ready.
///
/// Invariant: the queue is only ever non-empty when buffering is enabled
/// and the transport is not `Ready`. The adapter restores it by calling
/// [`AudioBuffer::clear`] after an immediate send and [`AudioBuffer::drain`]
/// on the ready transition.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    enabled: bool,
    queue: VecDeque<AudioChunk>,
}

impl AudioBuffer {
    /// Create a buffer; `enabled` is fixed for its lifetime.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, queue: VecDeque::new() }
    }

    /// Whether buffering was configured.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide whether `data` is queued or sent now.
    pub fn admit(&mut self, data: &[u8], state: TransportState) -> Admission {
        let chunk = AudioChunk::copy_from_slice(data);
        if self.enabled && !state.is_ready() {
            self.queue.push_back(chunk);
            Admission::Queued { position: self.queue.len() }
        } else {
            Admission::SendNow(chunk)
        }
    }

    /// Take every queued chunk in submission order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<AudioChunk> {
        self.queue.drain(..).collect()
    }

    /// Discard queued chunks, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// Number of queued chunks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
