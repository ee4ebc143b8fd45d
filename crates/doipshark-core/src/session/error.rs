use thiserror::Error;

use crate::protocols::doip::{DoipError, RoutingActivationCode};

use super::state::SessionState;

/// Failure reported by a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Session failures. Every one of them leaves the session in `Idle`
/// except `InvalidState` and `WrongTransport`, which change nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("routing activation denied (0x{:02x}): {}", .0.as_u8(), .0.description())]
    ActivationDenied(RoutingActivationCode),
    #[error("routing activation timed out after {waited_ms} ms")]
    ActivationTimeout { waited_ms: u64 },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("{operation} requires a {required} transport")]
    WrongTransport {
        operation: &'static str,
        required: &'static str,
    },
    #[error("DoIP error: {0}")]
    Doip(#[from] DoipError),
    #[error("failed to spawn session timer: {0}")]
    Spawn(String),
}
