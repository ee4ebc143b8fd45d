use crossbeam_channel::Sender;

use crate::TransportProtocol;

use super::error::TransportError;

/// Byte pipe the session writes DoIP messages to.
///
/// The session never reads; whoever owns the socket feeds received bytes to
/// [`DoipSession::handle_incoming`](super::DoipSession::handle_incoming).
pub trait Transport: Send + Sync {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    fn protocol(&self) -> TransportProtocol;

    fn is_tcp(&self) -> bool {
        self.protocol() == TransportProtocol::Tcp
    }
}

/// Transport that forwards every outgoing message into a channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    protocol: TransportProtocol,
    sender: Sender<Vec<u8>>,
}

impl ChannelTransport {
    pub fn new(protocol: TransportProtocol, sender: Sender<Vec<u8>>) -> Self {
        Self { protocol, sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sender
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    fn protocol(&self) -> TransportProtocol {
        self.protocol
    }
}
