//! Tester session against a scripted entity speaking through channels.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};
use doipshark_core::TransportProtocol;
use doipshark_core::config::SessionConfig;
use doipshark_core::protocols::doip::{
    self, DEFAULT_PROTOCOL_VERSION as V, DoipPayload, RoutingActivationCode,
    RoutingActivationResponse, VehicleAnnouncement,
};
use doipshark_core::session::{
    ChannelTransport, DoipSession, IdentificationRequest, SessionError, SessionEvent,
    SessionState, Transport,
};

const TESTER: u16 = 0x0e00;
const ENTITY: u16 = 0x1001;

struct Harness {
    session: DoipSession,
    wire: Receiver<Vec<u8>>,
    events: Receiver<SessionEvent>,
    protocol: TransportProtocol,
}

impl Harness {
    fn open(config: SessionConfig) -> Self {
        let (wire_tx, wire) = unbounded();
        let (events_tx, events) = unbounded();
        let protocol = config.transport;
        let transport: Arc<dyn Transport> = Arc::new(ChannelTransport::new(protocol, wire_tx));
        let session = DoipSession::new(config, transport, events_tx).unwrap();
        Self {
            session,
            wire,
            events,
            protocol,
        }
    }

    /// Next message the tester put on the wire, decoded as the entity sees it.
    fn sent(&self) -> DoipPayload {
        let bytes = self.wire.recv_timeout(Duration::from_secs(1)).unwrap();
        let message = doip::parse_message(&bytes, self.protocol).unwrap();
        assert_eq!(message.consumed, bytes.len());
        doip::decode_payload(&message.header, message.payload).unwrap()
    }

    fn drain(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }
}

fn activation(code: RoutingActivationCode) -> Vec<u8> {
    doip::construct_routing_activation_response(
        V,
        &RoutingActivationResponse {
            tester_address: TESTER,
            entity_address: ENTITY,
            code,
            oem_specific: None,
        },
    )
    .to_bytes()
}

#[test]
fn activation_then_diagnostic_round_trip() {
    let harness = Harness::open(SessionConfig::default());
    harness.session.start().unwrap();

    match harness.sent() {
        DoipPayload::RoutingActivationRequest(request) => {
            assert_eq!(request.source_address, TESTER);
            assert_eq!(request.activation_type, 0x00);
        }
        other => panic!("expected routing activation request, got {other:?}"),
    }
    assert_eq!(harness.session.state(), SessionState::RoutingActivationPending);

    harness
        .session
        .handle_incoming(&activation(RoutingActivationCode::SuccessfullyActivated))
        .unwrap();
    assert_eq!(harness.session.state(), SessionState::Activated);
    let events = harness.drain();
    assert!(events.contains(&SessionEvent::StateChanged {
        from: SessionState::RoutingActivationPending,
        to: SessionState::Activated,
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, SessionEvent::Activated(response) if response.entity_address == ENTITY)));

    harness.session.send_diagnostic(&[0x10, 0x03]).unwrap();
    match harness.sent() {
        DoipPayload::DiagnosticMessage(message) => {
            assert_eq!(message.source_address, TESTER);
            assert_eq!(message.target_address, ENTITY);
            assert_eq!(message.user_data, vec![0x10, 0x03]);
        }
        other => panic!("expected diagnostic message, got {other:?}"),
    }

    let mut reply = doip::construct_diagnostic_positive_ack(V, ENTITY, TESTER, &[0x10, 0x03])
        .unwrap()
        .to_bytes();
    reply.extend(
        doip::construct_diagnostic_message(V, ENTITY, TESTER, &[0x50, 0x03, 0x00, 0x32, 0x01, 0xf4])
            .unwrap()
            .to_bytes(),
    );
    harness.session.handle_incoming(&reply).unwrap();

    let events = harness.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], SessionEvent::DiagnosticAck(ack) if ack.source_address == ENTITY));
    match &events[1] {
        SessionEvent::DiagnosticMessage(message) => assert_eq!(message.user_data[0], 0x50),
        other => panic!("expected diagnostic response, got {other:?}"),
    }

    harness.session.disconnect();
    assert_eq!(harness.session.state(), SessionState::Idle);
    assert!(
        harness.session.send_diagnostic(&[0x3e, 0x00]).is_err(),
        "diagnostics need an activated session"
    );
}

#[test]
fn alive_check_is_answered_while_activated() {
    let harness = Harness::open(SessionConfig::default());
    harness.session.start().unwrap();
    harness.sent();
    harness
        .session
        .handle_incoming(&activation(RoutingActivationCode::SuccessfullyActivated))
        .unwrap();
    harness.drain();

    harness
        .session
        .handle_incoming(&doip::construct_alive_check_request(V).to_bytes())
        .unwrap();
    match harness.sent() {
        DoipPayload::AliveCheckResponse { source_address } => assert_eq!(source_address, TESTER),
        other => panic!("expected alive check response, got {other:?}"),
    }
    assert_eq!(harness.drain(), vec![SessionEvent::AliveCheckAnswered]);
}

#[test]
fn denied_activation_returns_to_idle() {
    let harness = Harness::open(SessionConfig::default());
    harness.session.start().unwrap();
    harness.sent();

    harness
        .session
        .handle_incoming(&activation(RoutingActivationCode::UnknownSourceAddress))
        .unwrap();
    assert_eq!(harness.session.state(), SessionState::Idle);
    assert!(harness.drain().contains(&SessionEvent::Failed(
        SessionError::ActivationDenied(RoutingActivationCode::UnknownSourceAddress)
    )));
}

#[test]
fn silent_entity_times_out_activation() {
    let config = SessionConfig {
        activation_wait_ms: 100,
        ..SessionConfig::default()
    };
    let harness = Harness::open(config);
    harness.session.start().unwrap();
    harness.sent();

    let failure = loop {
        match harness.events.recv_timeout(Duration::from_secs(2)).unwrap() {
            SessionEvent::Failed(err) => break err,
            _ => continue,
        }
    };
    assert!(matches!(failure, SessionError::ActivationTimeout { .. }));
    assert_eq!(harness.session.state(), SessionState::Idle);

    // A late answer no longer activates anything.
    harness
        .session
        .handle_incoming(&activation(RoutingActivationCode::SuccessfullyActivated))
        .unwrap();
    assert_eq!(harness.session.state(), SessionState::Idle);
}

#[test]
fn udp_identification_accepts_one_announcement() {
    let config = SessionConfig {
        transport: TransportProtocol::Udp,
        ..SessionConfig::default()
    };
    let harness = Harness::open(config);
    harness.session.start().unwrap();
    assert_eq!(harness.session.state(), SessionState::Activated);
    assert!(harness.wire.is_empty());

    harness
        .session
        .request_vehicle_identification(IdentificationRequest::All)
        .unwrap();
    assert!(matches!(
        harness.sent(),
        DoipPayload::VehicleIdentificationRequest
    ));
    assert!(harness.session.identification_outstanding());
    harness.drain();

    let announcement = VehicleAnnouncement {
        vin: *b"WDD1234567890ABCD",
        logical_address: ENTITY,
        eid: [0x02, 0, 0, 0, 0x10, 0x01],
        gid: [0; 6],
        further_action: 0x00,
        sync_status: None,
    };
    let bytes = doip::construct_vehicle_announcement(V, &announcement).to_bytes();
    harness.session.handle_incoming(&bytes).unwrap();
    harness.session.handle_incoming(&bytes).unwrap();

    let events = harness.drain();
    assert_eq!(events, vec![SessionEvent::VehicleAnnouncement(announcement)]);
    assert!(!harness.session.identification_outstanding());
}
