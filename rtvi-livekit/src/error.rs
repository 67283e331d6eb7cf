//! Error types for the transport.

use thiserror::Error;

use crate::state::{Transition, TransportState};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur inside the transport or its session back-end.
///
/// Most of these never reach the host: the adapter logs them at the boundary
/// where they occur. `Unsupported` is the exception and is returned for
/// capabilities the transport cannot provide.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Room connection could not be established.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A local track could not be created or published.
    #[error("Track publish error: {0}")]
    PublishError(String),

    /// Sending on the data channel failed.
    #[error("Data channel error: {0}")]
    DataChannelError(String),

    /// Device enumeration or selection failed.
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Capability not available on this transport.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The state machine has no edge for this request.
    #[error("Invalid transition: {transition:?} from {from}")]
    InvalidTransition {
        /// State at the time of the request.
        from: TransportState,
        /// Requested transition.
        transition: Transition,
    },

    /// Operation requires an established session.
    #[error("Session not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Media provider specific error.
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl TransportError {
    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a new track publish error.
    pub fn publish<S: Into<String>>(msg: S) -> Self {
        Self::PublishError(msg.into())
    }

    /// Create a new data channel error.
    pub fn data_channel<S: Into<String>>(msg: S) -> Self {
        Self::DataChannelError(msg.into())
    }

    /// Create a new device error.
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::DeviceError(msg.into())
    }

    /// Create a new unsupported-capability error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new provider error.
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::ProviderError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::connection("room unreachable");
        assert_eq!(err.to_string(), "Connection error: room unreachable");

        let err = TransportError::NotConnected;
        assert_eq!(err.to_string(), "Session not connected");

        let err = TransportError::unsupported("speaker selection");
        assert!(err.to_string().contains("speaker selection"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = TransportError::InvalidTransition {
            from: TransportState::Disconnected,
            transition: Transition::BotReady,
        };
        assert_eq!(err.to_string(), "Invalid transition: BotReady from disconnected");
    }

    #[test]
    fn test_from_serde_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: TransportError = parse.unwrap_err().into();
        assert!(matches!(err, TransportError::SerializationError(_)));
    }
}
