//! DoIP tester-side client session.
//!
//! `Idle -> RoutingActivationPending -> Activated`, back to `Idle` on
//! denial, timeout, send failure or disconnect. The session writes through
//! a [`Transport`] and is fed received bytes by its owner; it never opens
//! sockets itself. Outcomes are reported as [`SessionEvent`]s.
//!
//! Version française (résumé):
//! Machine à états du testeur DoIP : activation de routage avec délai
//! d'attente, réponse automatique au contrôle de présence, échange de
//! messages de diagnostic. Le transport est fourni par l'appelant.

mod client;
mod error;
mod state;
mod timer;
mod transport;

pub use client::DoipSession;
pub use error::{SessionError, TransportError};
pub use state::{IdentificationRequest, SessionEvent, SessionState};
pub use transport::{ChannelTransport, Transport};
