use std::fmt;

use serde::Serialize;

use crate::protocols::doip::{
    DiagnosticAck, DiagnosticMessage, EntityStatusResponse, NackCode, PowerMode,
    RoutingActivationResponse, VehicleAnnouncement,
};

use super::error::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    RoutingActivationPending,
    Activated,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::RoutingActivationPending => "RoutingActivationPending",
            SessionState::Activated => "Activated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an identification request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentificationRequest {
    All,
    Eid([u8; 6]),
    Vin([u8; 17]),
}

/// Notifications emitted by a [`DoipSession`](super::DoipSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    Activated(RoutingActivationResponse),
    /// Asynchronous failure; the session is back in `Idle`.
    Failed(SessionError),
    VehicleAnnouncement(VehicleAnnouncement),
    DiagnosticMessage(DiagnosticMessage),
    DiagnosticAck(DiagnosticAck),
    DiagnosticNack(DiagnosticAck),
    EntityStatus(EntityStatusResponse),
    PowerMode(PowerMode),
    AliveCheckAnswered,
    /// Incoming bytes failed header validation.
    Rejected(NackCode),
}
