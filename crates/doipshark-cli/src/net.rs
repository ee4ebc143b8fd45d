//! Socket transports for `doipshark session`.
//!
//! The session never touches sockets; these commands own them, write
//! through a [`Transport`] and feed everything they read back into
//! [`DoipSession::handle_incoming`]. Events are printed as JSON lines.

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::{Receiver, unbounded};
use doipshark_core::TransportProtocol;
use doipshark_core::config::SessionConfig;
use doipshark_core::protocols::doip::DOIP_PORT;
use doipshark_core::protocols::uds;
use doipshark_core::session::{
    DoipSession, IdentificationRequest, SessionEvent, SessionState, Transport, TransportError,
};
use log::{debug, info};
use serde_json::{Value, json};

const READ_SLICE: Duration = Duration::from_millis(50);
/// UDS negative response code "request correctly received, response pending".
const RESPONSE_PENDING: u8 = 0x78;

struct TcpTransport {
    stream: TcpStream,
}

impl Transport for TcpTransport {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        (&self.stream)
            .write_all(bytes)
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::Tcp
    }
}

struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Transport for UdpTransport {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.socket
            .send_to(bytes, self.target)
            .map(|_| ())
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::Udp
    }
}

/// Resolve `host` or `host:port`, defaulting to the DoIP port.
fn resolve(target: &str) -> Result<SocketAddr> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DOIP_PORT));
    }
    let candidates = if target.contains(':') {
        target.to_socket_addrs()
    } else {
        (target, DOIP_PORT).to_socket_addrs()
    };
    candidates
        .with_context(|| format!("Failed to resolve target: {target}"))?
        .next()
        .ok_or_else(|| anyhow!("no address found for {target}"))
}

pub(crate) fn identify(
    target: &str,
    mut config: SessionConfig,
    eid: Option<[u8; 6]>,
    vin: Option<[u8; 17]>,
    timeout: Duration,
) -> Result<()> {
    let target = resolve(target)?;
    config.transport = TransportProtocol::Udp;

    let socket = UdpSocket::bind(("0.0.0.0", 0)).context("Failed to bind UDP socket")?;
    socket
        .set_broadcast(true)
        .context("Failed to enable UDP broadcast")?;
    socket
        .set_read_timeout(Some(READ_SLICE))
        .context("Failed to set socket timeout")?;
    let reader = socket.try_clone().context("Failed to clone UDP socket")?;

    let (events_tx, events) = unbounded();
    let transport: Arc<dyn Transport> = Arc::new(UdpTransport { socket, target });
    let session = DoipSession::new(config, transport, events_tx)?;
    session.start()?;

    let request = match (eid, vin) {
        (Some(eid), _) => IdentificationRequest::Eid(eid),
        (None, Some(vin)) => IdentificationRequest::Vin(vin),
        (None, None) => IdentificationRequest::All,
    };
    session.request_vehicle_identification(request)?;
    info!("vehicle identification request sent to {target}");

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; 4096];
    while Instant::now() < deadline {
        match reader.recv_from(&mut buf) {
            Ok((n, peer)) => {
                debug!("{n} bytes from {peer}");
                session.handle_incoming(&buf[..n])?;
            }
            Err(err) if is_timeout(&err) => {}
            Err(err) => return Err(err).context("UDP receive failed"),
        }
        for event in events.try_iter() {
            print_event(&event);
            if matches!(event, SessionEvent::VehicleAnnouncement(_)) {
                return Ok(());
            }
        }
    }
    bail!("no vehicle announcement within {} ms", timeout.as_millis())
}

pub(crate) fn diagnostic(
    target: &str,
    mut config: SessionConfig,
    user_data: &[u8],
    timeout: Duration,
) -> Result<()> {
    let target = resolve(target)?;
    config.transport = TransportProtocol::Tcp;
    let activation_wait = config.activation_wait();

    let stream = TcpStream::connect_timeout(&target, timeout)
        .with_context(|| format!("Failed to connect to {target}"))?;
    stream
        .set_read_timeout(Some(READ_SLICE))
        .context("Failed to set socket timeout")?;
    stream.set_nodelay(true).ok();
    let mut reader = stream.try_clone().context("Failed to clone TCP stream")?;

    let (events_tx, events) = unbounded();
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport { stream });
    let session = DoipSession::new(config, transport, events_tx)?;
    session.start()?;

    let mut pump = Pump {
        reader: &mut reader,
        session: &session,
        events: &events,
        buf: vec![0u8; 64 * 1024],
    };

    let activated = pump.until(Instant::now() + activation_wait * 2, |event| match event {
        SessionEvent::Failed(err) => Some(Err(anyhow!("routing activation failed: {err}"))),
        SessionEvent::StateChanged {
            to: SessionState::Activated,
            ..
        } => Some(Ok(())),
        _ => None,
    });
    match activated {
        Some(result) => result?,
        None if session.state() == SessionState::Activated => {}
        None => bail!("routing activation did not complete"),
    }

    session.send_diagnostic(user_data)?;
    let request_sid = user_data.first().copied();
    let response = pump.until(Instant::now() + timeout, |event| match event {
        SessionEvent::DiagnosticNack(ack) => Some(Err(anyhow!(
            "diagnostic message refused with code 0x{:02x}",
            ack.code
        ))),
        SessionEvent::DiagnosticMessage(message) => {
            if is_final_response(request_sid, &message.user_data) {
                Some(Ok(()))
            } else {
                None
            }
        }
        SessionEvent::Failed(err) => Some(Err(anyhow!("session failed: {err}"))),
        _ => None,
    });
    session.disconnect();
    match response {
        Some(result) => result,
        None => bail!("no diagnostic response within {} ms", timeout.as_millis()),
    }
}

/// Response pending (0x7F sid 0x78) keeps the exchange open.
fn is_final_response(request_sid: Option<u8>, data: &[u8]) -> bool {
    match data {
        [0x7f, sid, code, ..] => Some(*sid) != request_sid || *code != RESPONSE_PENDING,
        _ => true,
    }
}

struct Pump<'a> {
    reader: &'a mut TcpStream,
    session: &'a DoipSession,
    events: &'a Receiver<SessionEvent>,
    buf: Vec<u8>,
}

impl Pump<'_> {
    /// Read and dispatch until `decide` returns a verdict or the deadline
    /// passes. Every event is printed on the way.
    fn until<F>(&mut self, deadline: Instant, mut decide: F) -> Option<Result<()>>
    where
        F: FnMut(&SessionEvent) -> Option<Result<()>>,
    {
        loop {
            for event in self.events.try_iter() {
                print_event(&event);
                if let Some(verdict) = decide(&event) {
                    return Some(verdict);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Some(Err(anyhow!("connection closed by the entity"))),
                Ok(n) => {
                    if let Err(err) = self.session.handle_incoming(&self.buf[..n]) {
                        return Some(Err(err.into()));
                    }
                }
                Err(err) if is_timeout(&err) => {}
                Err(err) => return Some(Err(anyhow!("TCP receive failed: {err}"))),
            }
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn print_event(event: &SessionEvent) {
    println!("{}", event_json(event));
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn event_json(event: &SessionEvent) -> Value {
    match event {
        SessionEvent::StateChanged { from, to } => {
            json!({"event": "state", "from": from, "to": to})
        }
        SessionEvent::Activated(response) => json!({
            "event": "activated",
            "tester_address": response.tester_address,
            "entity_address": response.entity_address,
            "code": response.code.as_u8(),
        }),
        SessionEvent::Failed(err) => json!({"event": "failed", "error": err.to_string()}),
        SessionEvent::VehicleAnnouncement(announcement) => json!({
            "event": "vehicle_announcement",
            "vin": announcement.vin_string(),
            "logical_address": announcement.logical_address,
            "eid": hex(&announcement.eid),
            "gid": hex(&announcement.gid),
            "further_action": announcement.further_action,
            "sync_status": announcement.sync_status,
        }),
        SessionEvent::DiagnosticMessage(message) => json!({
            "event": "diagnostic_message",
            "source_address": message.source_address,
            "target_address": message.target_address,
            "uds_service": message.user_data.first().and_then(|sid| uds::service_name(*sid)),
            "data": hex(&message.user_data),
        }),
        SessionEvent::DiagnosticAck(ack) => json!({
            "event": "diagnostic_ack",
            "source_address": ack.source_address,
            "code": ack.code,
        }),
        SessionEvent::DiagnosticNack(ack) => json!({
            "event": "diagnostic_nack",
            "source_address": ack.source_address,
            "code": ack.code,
        }),
        SessionEvent::EntityStatus(status) => json!({
            "event": "entity_status",
            "node_type": status.node_type,
            "max_open_sockets": status.max_open_sockets,
            "open_sockets": status.open_sockets,
            "max_data_size": status.max_data_size,
        }),
        SessionEvent::PowerMode(mode) => json!({"event": "power_mode", "mode": mode.as_u8()}),
        SessionEvent::AliveCheckAnswered => json!({"event": "alive_check_answered"}),
        SessionEvent::Rejected(nack) => json!({"event": "rejected", "nack": nack.as_str()}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doipshark_core::protocols::doip::DiagnosticMessage;

    #[test]
    fn bare_ip_targets_default_to_doip_port() {
        let addr = resolve("192.168.0.20").unwrap();
        assert_eq!(addr.port(), DOIP_PORT);
        let addr = resolve("127.0.0.1:13401").unwrap();
        assert_eq!(addr.port(), 13401);
    }

    #[test]
    fn response_pending_is_not_final() {
        assert!(!is_final_response(Some(0x31), &[0x7f, 0x31, 0x78]));
        assert!(is_final_response(Some(0x31), &[0x7f, 0x31, 0x22]));
        assert!(is_final_response(Some(0x10), &[0x50, 0x03]));
    }

    #[test]
    fn diagnostic_events_carry_service_names() {
        let event = SessionEvent::DiagnosticMessage(DiagnosticMessage {
            source_address: 0x1001,
            target_address: 0x0e00,
            user_data: vec![0x50, 0x03],
        });
        let value = event_json(&event);
        assert_eq!(value["event"], "diagnostic_message");
        assert_eq!(value["uds_service"], "DiagnosticSessionControl");
        assert_eq!(value["data"], "5003");
    }
}
