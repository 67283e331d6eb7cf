//! Connection lifecycle state machine.
//!
//! ```text
//!                 ConnectRequested           SessionEstablished            BotReady
//!  Disconnected ─────────────────▶ Connecting ─────────────────▶ Connected ──────────▶ Ready
//!       ▲                              │                            │                   │
//!       │         SessionFailed        │                            │                   │
//!       ├──────────────────────────────┘                            │                   │
//!       │                 DisconnectRequested                       │                   │
//!       └───────────────────────────────────────────────────────────┴───────────────────┘
//! ```
//!
//! [`TransportState::apply`] is pure; the adapter performs the side effects
//! that belong to each edge.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TransportError};

/// Readiness of the transport, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// No session. Initial state and the state after any failure.
    #[default]
    Disconnected,
    /// Session establishment has been issued.
    Connecting,
    /// Session established; the bot has not signalled readiness yet.
    Connected,
    /// The bot can consume audio.
    Ready,
}

impl TransportState {
    /// Whether a session is currently established.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }

    /// Whether the bot has signalled readiness.
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    /// Compute the state reached by `transition`.
    ///
    /// Disconnecting while already disconnected is accepted and leaves the
    /// state unchanged. Every other pair without an edge is rejected.
    pub fn apply(self, transition: Transition) -> Result<TransportState> {
        use Transition::*;
        use TransportState::*;

        match (self, transition) {
            (Disconnected, ConnectRequested) => Ok(Connecting),
            (Connecting, SessionEstablished) => Ok(Connected),
            (Connecting, SessionFailed) => Ok(Disconnected),
            (Connected, BotReady) => Ok(Ready),
            (_, DisconnectRequested) => Ok(Disconnected),
            (from, transition) => Err(TransportError::InvalidTransition { from, transition }),
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Events that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The host asked to connect.
    ConnectRequested,
    /// The session handle connected.
    SessionEstablished,
    /// The session handle failed to connect.
    SessionFailed,
    /// The host relayed the bot's ready signal.
    BotReady,
    /// The host asked to disconnect.
    DisconnectRequested,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [TransportState; 4] = [
        TransportState::Disconnected,
        TransportState::Connecting,
        TransportState::Connected,
        TransportState::Ready,
    ];

    #[test]
    fn test_happy_path() {
        let state = TransportState::default();
        let state = state.apply(Transition::ConnectRequested).unwrap();
        assert_eq!(state, TransportState::Connecting);
        let state = state.apply(Transition::SessionEstablished).unwrap();
        assert_eq!(state, TransportState::Connected);
        let state = state.apply(Transition::BotReady).unwrap();
        assert_eq!(state, TransportState::Ready);
        let state = state.apply(Transition::DisconnectRequested).unwrap();
        assert_eq!(state, TransportState::Disconnected);
    }

    #[test]
    fn test_failed_establishment_returns_to_disconnected() {
        let state = TransportState::Connecting.apply(Transition::SessionFailed).unwrap();
        assert_eq!(state, TransportState::Disconnected);
    }

    #[test]
    fn test_disconnect_from_every_state() {
        for state in ALL_STATES {
            assert_eq!(
                state.apply(Transition::DisconnectRequested).unwrap(),
                TransportState::Disconnected
            );
        }
    }

    #[test]
    fn test_ready_only_from_connected() {
        for state in ALL_STATES {
            let result = state.apply(Transition::BotReady);
            if state == TransportState::Connected {
                assert_eq!(result.unwrap(), TransportState::Ready);
            } else {
                assert!(matches!(result, Err(TransportError::InvalidTransition { .. })));
            }
        }
    }

    #[test]
    fn test_connect_only_from_disconnected() {
        for state in ALL_STATES {
            let result = state.apply(Transition::ConnectRequested);
            assert_eq!(result.is_ok(), state == TransportState::Disconnected);
        }
    }

    #[test]
    fn test_session_outcome_only_while_connecting() {
        for state in [TransportState::Disconnected, TransportState::Connected, TransportState::Ready]
        {
            assert!(state.apply(Transition::SessionEstablished).is_err());
            assert!(state.apply(Transition::SessionFailed).is_err());
        }
    }

    #[test]
    fn test_display_and_serde_agree() {
        for state in ALL_STATES {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }

    #[test]
    fn test_predicates() {
        assert!(!TransportState::Connecting.is_connected());
        assert!(TransportState::Connected.is_connected());
        assert!(TransportState::Ready.is_connected());
        assert!(TransportState::Ready.is_ready());
        assert!(!TransportState::Connected.is_ready());
    }
}
