use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::TransportProtocol;
use crate::config::SessionConfig;
use crate::protocols::doip::{
    self, DoipMessage, DoipPayload, NackCode, RoutingActivationResponse, decode_payload,
    diagnostic_nack_reason, parse_header, parse_message,
};

use super::error::SessionError;
use super::state::{IdentificationRequest, SessionEvent, SessionState};
use super::timer::{Expire, Timer};
use super::transport::Transport;

struct Inner {
    state: SessionState,
    /// Bumped whenever the armed activation deadline becomes stale.
    generation: u64,
    identification_outstanding: bool,
    /// TCP bytes of a message whose tail has not arrived yet.
    pending: Vec<u8>,
}

struct SessionShared {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    events: Sender<SessionEvent>,
    inner: Mutex<Inner>,
}

impl SessionShared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("session event receiver dropped");
        }
    }

    fn transition(&self, inner: &mut Inner, to: SessionState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        info!("DoIP session {from} -> {to}");
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn send(&self, inner: &mut Inner, message: &DoipMessage) -> Result<(), SessionError> {
        match self.transport.send(&message.to_bytes()) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("DoIP send of {} failed: {err}", message.payload_type());
                inner.generation += 1;
                inner.identification_outstanding = false;
                self.transition(inner, SessionState::Idle);
                Err(err.into())
            }
        }
    }

    fn version(&self) -> u8 {
        self.config.protocol_version
    }
}

impl Inner {
    /// Append a stream chunk and cut every complete message off the front.
    fn take_stream_messages(&mut self, chunk: &[u8]) -> (Vec<Vec<u8>>, Option<NackCode>) {
        self.pending.extend_from_slice(chunk);
        let framing = frame(&self.pending, TransportProtocol::Tcp);
        let messages = framing.cut(&self.pending);
        if framing.rejected.is_some() {
            self.pending.clear();
        } else {
            self.pending.drain(..framing.consumed);
            if !self.pending.is_empty() {
                debug!("{} bytes buffered for the next read", self.pending.len());
            }
        }
        (messages, framing.rejected)
    }
}

/// Complete messages found at the front of a byte buffer.
struct Framing {
    lengths: Vec<usize>,
    consumed: usize,
    rejected: Option<NackCode>,
}

impl Framing {
    fn cut(&self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut offset = 0;
        self.lengths
            .iter()
            .map(|len| {
                let message = bytes[offset..offset + len].to_vec();
                offset += len;
                message
            })
            .collect()
    }
}

/// Walk headers until one is incomplete or invalid.
///
/// `InvalidPayloadLength` is the last header check, so it only ever means
/// the payload has not fully arrived.
fn frame(bytes: &[u8], protocol: TransportProtocol) -> Framing {
    let mut framing = Framing {
        lengths: Vec::new(),
        consumed: 0,
        rejected: None,
    };
    while bytes.len() - framing.consumed >= doip::layout::HEADER_LEN {
        match parse_header(&bytes[framing.consumed..], protocol) {
            Ok(header) => {
                let len = doip::layout::HEADER_LEN + header.payload_length as usize;
                framing.lengths.push(len);
                framing.consumed += len;
            }
            Err(NackCode::InvalidPayloadLength) => break,
            Err(nack) => {
                framing.rejected = Some(nack);
                break;
            }
        }
    }
    framing
}

/// A datagram carries whole messages; a truncated one is a length error.
fn split_datagram(bytes: &[u8]) -> (Vec<Vec<u8>>, Option<NackCode>) {
    let framing = frame(bytes, TransportProtocol::Udp);
    let mut rejected = framing.rejected;
    let rest = bytes.len() - framing.consumed;
    if rejected.is_none() && rest >= doip::layout::HEADER_LEN {
        rejected = Some(NackCode::InvalidPayloadLength);
    } else if rejected.is_none() && rest > 0 {
        debug!("{rest} trailing datagram bytes ignored");
    }
    (framing.cut(bytes), rejected)
}

impl Expire for SessionShared {
    fn expired(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.state != SessionState::RoutingActivationPending || inner.generation != generation
        {
            return;
        }
        inner.generation += 1;
        let waited_ms = self.config.activation_wait().as_millis() as u64;
        warn!("routing activation timed out after {waited_ms} ms");
        self.transition(&mut inner, SessionState::Idle);
        self.emit(SessionEvent::Failed(SessionError::ActivationTimeout { waited_ms }));
    }
}

/// DoIP tester-side session over a caller-supplied transport.
///
/// All transitions run under one lock, including the activation timeout,
/// which fires from a dedicated timer thread. At most one timeout is armed;
/// arming again replaces it.
///
/// Events go to `events`; use an unbounded channel, since the session sends
/// while holding its lock.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use crossbeam_channel::unbounded;
/// use doipshark_core::TransportProtocol;
/// use doipshark_core::config::SessionConfig;
/// use doipshark_core::session::{ChannelTransport, DoipSession, SessionState};
///
/// let (wire_tx, wire_rx) = unbounded();
/// let (events_tx, _events_rx) = unbounded();
/// let transport = Arc::new(ChannelTransport::new(TransportProtocol::Tcp, wire_tx));
/// let session = DoipSession::new(SessionConfig::default(), transport, events_tx)?;
/// session.start()?;
/// assert_eq!(session.state(), SessionState::RoutingActivationPending);
/// assert_eq!(wire_rx.recv().unwrap()[2..4], [0x00, 0x05]);
/// # Ok::<(), doipshark_core::session::SessionError>(())
/// ```
pub struct DoipSession {
    shared: Arc<SessionShared>,
    timer: Timer,
}

impl DoipSession {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        events: Sender<SessionEvent>,
    ) -> Result<Self, SessionError> {
        if config.transport != transport.protocol() {
            debug!(
                "session configured for {} but transport is {}",
                config.transport.as_str(),
                transport.protocol().as_str()
            );
        }
        let shared = Arc::new(SessionShared {
            config,
            transport,
            events,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                generation: 0,
                identification_outstanding: false,
                pending: Vec::new(),
            }),
        });
        let timer = Timer::spawn(Arc::downgrade(&shared))
            .map_err(|err| SessionError::Spawn(err.to_string()))?;
        Ok(Self { shared, timer })
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn identification_outstanding(&self) -> bool {
        self.shared.lock().identification_outstanding
    }

    /// Request routing activation.
    ///
    /// Over TCP this sends the activation request and, when activation is
    /// required, waits for the response in `RoutingActivationPending`.
    /// Routing activation does not exist over UDP, so a UDP session is
    /// `Activated` at once.
    pub fn start(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "start",
                state: inner.state,
            });
        }
        if shared.transport.protocol() == TransportProtocol::Udp {
            shared.transition(&mut inner, SessionState::Activated);
            return Ok(());
        }

        let config = &shared.config;
        let request = doip::construct_routing_activation_request(
            shared.version(),
            config.source_address,
            config.activation_type,
            config.oem_specific,
        );
        shared.send(&mut inner, &request)?;
        if config.activation_required {
            inner.generation += 1;
            self.timer
                .arm(inner.generation, Instant::now() + config.activation_wait());
            shared.transition(&mut inner, SessionState::RoutingActivationPending);
        } else {
            shared.transition(&mut inner, SessionState::Activated);
        }
        Ok(())
    }

    /// Feed bytes received from the transport.
    ///
    /// Over TCP the bytes are a slice of a stream: they are appended to the
    /// unfinished tail of the previous call and every complete message is
    /// handled in order. The remainder waits for the next call. A UDP
    /// datagram is framed on its own.
    ///
    /// A header that fails the pattern, size or payload-type check is
    /// reported as [`SessionEvent::Rejected`] and the buffered stream is
    /// discarded, since there is no way to find the next header.
    pub fn handle_incoming(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let shared = &self.shared;
        let protocol = shared.transport.protocol();
        let (messages, rejected) = match protocol {
            TransportProtocol::Tcp => shared.lock().take_stream_messages(bytes),
            TransportProtocol::Udp => split_datagram(bytes),
        };

        for bytes in &messages {
            let message = match parse_message(bytes, protocol) {
                Ok(message) => message,
                Err(nack) => {
                    shared.emit(SessionEvent::Rejected(nack));
                    return Ok(());
                }
            };
            let payload = decode_payload(&message.header, message.payload)?;
            self.dispatch(payload)?;
        }
        if let Some(nack) = rejected {
            warn!("incoming DoIP message rejected: {nack}");
            shared.emit(SessionEvent::Rejected(nack));
        }
        Ok(())
    }

    fn dispatch(&self, payload: DoipPayload) -> Result<(), SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        match payload {
            DoipPayload::RoutingActivationResponse(response) => {
                self.on_activation_response(&mut inner, response)
            }
            DoipPayload::AliveCheckRequest => {
                if inner.state != SessionState::Activated || !shared.config.alive_check_response {
                    debug!("alive check request ignored in {}", inner.state);
                    return Ok(());
                }
                let answer = doip::construct_alive_check_response(
                    shared.version(),
                    shared.config.source_address,
                );
                shared.send(&mut inner, &answer)?;
                shared.emit(SessionEvent::AliveCheckAnswered);
                Ok(())
            }
            DoipPayload::VehicleAnnouncement(announcement) => {
                if !inner.identification_outstanding {
                    debug!("unsolicited vehicle announcement ignored");
                    return Ok(());
                }
                inner.identification_outstanding = false;
                info!(
                    "vehicle announcement: VIN {} address 0x{:04x}",
                    announcement.vin_string(),
                    announcement.logical_address
                );
                shared.emit(SessionEvent::VehicleAnnouncement(announcement));
                Ok(())
            }
            DoipPayload::DiagnosticMessage(message) if inner.state == SessionState::Activated => {
                shared.emit(SessionEvent::DiagnosticMessage(message));
                Ok(())
            }
            DoipPayload::DiagnosticPositiveAck(ack) if inner.state == SessionState::Activated => {
                shared.emit(SessionEvent::DiagnosticAck(ack));
                Ok(())
            }
            DoipPayload::DiagnosticNegativeAck(ack) if inner.state == SessionState::Activated => {
                warn!(
                    "diagnostic message refused by 0x{:04x}: {}",
                    ack.source_address,
                    diagnostic_nack_reason(ack.code)
                );
                shared.emit(SessionEvent::DiagnosticNack(ack));
                Ok(())
            }
            DoipPayload::EntityStatusResponse(status) => {
                shared.emit(SessionEvent::EntityStatus(status));
                Ok(())
            }
            DoipPayload::PowerModeResponse(mode) => {
                shared.emit(SessionEvent::PowerMode(mode));
                Ok(())
            }
            other => {
                debug!("ignoring {other:?} in {}", inner.state);
                Ok(())
            }
        }
    }

    fn on_activation_response(
        &self,
        inner: &mut Inner,
        response: RoutingActivationResponse,
    ) -> Result<(), SessionError> {
        let shared = &self.shared;
        if inner.state != SessionState::RoutingActivationPending {
            debug!(
                "routing activation response 0x{:02x} ignored in {}",
                response.code.as_u8(),
                inner.state
            );
            return Ok(());
        }
        inner.generation += 1;
        self.timer.cancel();
        if response.code.is_success() {
            shared.transition(inner, SessionState::Activated);
            shared.emit(SessionEvent::Activated(response));
        } else {
            warn!(
                "routing activation denied by 0x{:04x}: {}",
                response.entity_address,
                response.code.description()
            );
            shared.transition(inner, SessionState::Idle);
            shared.emit(SessionEvent::Failed(SessionError::ActivationDenied(
                response.code,
            )));
        }
        Ok(())
    }

    /// Wrap `user_data` in a diagnostic message to the configured target.
    pub fn send_diagnostic(&self, user_data: &[u8]) -> Result<(), SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.state != SessionState::Activated {
            return Err(SessionError::InvalidState {
                operation: "send_diagnostic",
                state: inner.state,
            });
        }
        let message = doip::construct_diagnostic_message(
            shared.version(),
            shared.config.source_address,
            shared.config.target_address,
            user_data,
        )?;
        shared.send(&mut inner, &message)
    }

    /// Send a vehicle identification request and accept the next
    /// announcement.
    pub fn request_vehicle_identification(
        &self,
        request: IdentificationRequest,
    ) -> Result<(), SessionError> {
        let version = self.shared.version();
        let message = match request {
            IdentificationRequest::All => doip::construct_vehicle_identification_request(version),
            IdentificationRequest::Eid(eid) => {
                doip::construct_vehicle_identification_request_eid(version, eid)
            }
            IdentificationRequest::Vin(vin) => {
                doip::construct_vehicle_identification_request_vin(version, vin)
            }
        };
        self.send_udp("request_vehicle_identification", &message, true)
    }

    pub fn request_entity_status(&self) -> Result<(), SessionError> {
        let message = doip::construct_entity_status_request(self.shared.version());
        self.send_udp("request_entity_status", &message, false)
    }

    pub fn request_power_mode(&self) -> Result<(), SessionError> {
        let message = doip::construct_power_mode_request(self.shared.version());
        self.send_udp("request_power_mode", &message, false)
    }

    fn send_udp(
        &self,
        operation: &'static str,
        message: &DoipMessage,
        identification: bool,
    ) -> Result<(), SessionError> {
        let shared = &self.shared;
        if shared.transport.protocol() != TransportProtocol::Udp {
            return Err(SessionError::WrongTransport {
                operation,
                required: TransportProtocol::Udp.as_str(),
            });
        }
        let mut inner = shared.lock();
        if inner.state != SessionState::Activated {
            return Err(SessionError::InvalidState {
                operation,
                state: inner.state,
            });
        }
        if identification {
            inner.identification_outstanding = true;
        }
        shared.send(&mut inner, message)
    }

    /// Return to `Idle`, dropping any pending activation.
    pub fn disconnect(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        inner.generation += 1;
        inner.identification_outstanding = false;
        inner.pending.clear();
        self.timer.cancel();
        shared.transition(&mut inner, SessionState::Idle);
    }
}
