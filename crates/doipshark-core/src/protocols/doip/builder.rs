//! Builders for the standard DoIP messages.
//!
//! Each builder takes the protocol version to stamp into the header and
//! returns a [`DoipMessage`] whose header length matches its payload.

use super::error::DoipError;
use super::layout;
use super::message::{DoipMessage, PayloadType};
use super::payload::{EntityStatusResponse, PowerMode, RoutingActivationResponse, VehicleAnnouncement};

pub fn construct_vehicle_identification_request(version: u8) -> DoipMessage {
    DoipMessage::new(version, PayloadType::VehicleIdentificationRequest, Vec::new())
}

pub fn construct_vehicle_identification_request_eid(
    version: u8,
    eid: [u8; layout::EID_LEN],
) -> DoipMessage {
    DoipMessage::new(
        version,
        PayloadType::VehicleIdentificationRequestEid,
        eid.to_vec(),
    )
}

pub fn construct_vehicle_identification_request_vin(
    version: u8,
    vin: [u8; layout::VIN_LEN],
) -> DoipMessage {
    DoipMessage::new(
        version,
        PayloadType::VehicleIdentificationRequestVin,
        vin.to_vec(),
    )
}

pub fn construct_vehicle_announcement(version: u8, announcement: &VehicleAnnouncement) -> DoipMessage {
    let mut payload = Vec::with_capacity(layout::ANNOUNCE_MIN_LEN + 1);
    payload.extend_from_slice(&announcement.vin);
    payload.extend_from_slice(&announcement.logical_address.to_be_bytes());
    payload.extend_from_slice(&announcement.eid);
    payload.extend_from_slice(&announcement.gid);
    payload.push(announcement.further_action);
    if let Some(sync_status) = announcement.sync_status {
        payload.push(sync_status);
    }
    DoipMessage::new(version, PayloadType::VehicleAnnouncement, payload)
}

/// Source address, activation type, four reserved bytes, optional OEM block.
pub fn construct_routing_activation_request(
    version: u8,
    source_address: u16,
    activation_type: u8,
    oem_specific: Option<[u8; layout::OEM_SPECIFIC_LEN]>,
) -> DoipMessage {
    let mut payload = Vec::with_capacity(layout::RA_REQ_OEM_RANGE.end);
    payload.extend_from_slice(&source_address.to_be_bytes());
    payload.push(activation_type);
    payload.extend_from_slice(&[0u8; layout::RESERVED_LEN]);
    if let Some(oem) = oem_specific {
        payload.extend_from_slice(&oem);
    }
    DoipMessage::new(version, PayloadType::RoutingActivationRequest, payload)
}

pub fn construct_routing_activation_response(
    version: u8,
    response: &RoutingActivationResponse,
) -> DoipMessage {
    let mut payload = Vec::with_capacity(layout::RA_RES_OEM_RANGE.end);
    payload.extend_from_slice(&response.tester_address.to_be_bytes());
    payload.extend_from_slice(&response.entity_address.to_be_bytes());
    payload.push(response.code.as_u8());
    payload.extend_from_slice(&[0u8; layout::RESERVED_LEN]);
    if let Some(oem) = response.oem_specific {
        payload.extend_from_slice(&oem);
    }
    DoipMessage::new(version, PayloadType::RoutingActivationResponse, payload)
}

pub fn construct_alive_check_request(version: u8) -> DoipMessage {
    DoipMessage::new(version, PayloadType::AliveCheckRequest, Vec::new())
}

pub fn construct_alive_check_response(version: u8, source_address: u16) -> DoipMessage {
    DoipMessage::new(
        version,
        PayloadType::AliveCheckResponse,
        source_address.to_be_bytes().to_vec(),
    )
}

pub fn construct_entity_status_request(version: u8) -> DoipMessage {
    DoipMessage::new(version, PayloadType::EntityStatusRequest, Vec::new())
}

pub fn construct_entity_status_response(version: u8, status: &EntityStatusResponse) -> DoipMessage {
    let mut payload = vec![status.node_type, status.max_open_sockets, status.open_sockets];
    if let Some(max_data_size) = status.max_data_size {
        payload.extend_from_slice(&max_data_size.to_be_bytes());
    }
    DoipMessage::new(version, PayloadType::EntityStatusResponse, payload)
}

pub fn construct_power_mode_request(version: u8) -> DoipMessage {
    DoipMessage::new(version, PayloadType::PowerModeRequest, Vec::new())
}

pub fn construct_power_mode_response(version: u8, mode: PowerMode) -> DoipMessage {
    DoipMessage::new(version, PayloadType::PowerModeResponse, vec![mode.as_u8()])
}

/// Wrap UDS user data between the source and target logical addresses.
///
/// # Errors
/// `EmptyUserData` when `user_data` is empty, `PayloadTooLarge` when the
/// message would not fit the 32-bit length field.
pub fn construct_diagnostic_message(
    version: u8,
    source_address: u16,
    target_address: u16,
    user_data: &[u8],
) -> Result<DoipMessage, DoipError> {
    if user_data.is_empty() {
        return Err(DoipError::EmptyUserData);
    }
    let payload = addressed_payload(source_address, target_address, None, user_data)?;
    Ok(DoipMessage::new(version, PayloadType::DiagnosticMessage, payload))
}

pub fn construct_diagnostic_positive_ack(
    version: u8,
    source_address: u16,
    target_address: u16,
    previous_data: &[u8],
) -> Result<DoipMessage, DoipError> {
    let payload = addressed_payload(
        source_address,
        target_address,
        Some(layout::DIAG_POSITIVE_ACK_CODE),
        previous_data,
    )?;
    Ok(DoipMessage::new(
        version,
        PayloadType::DiagnosticMessagePositiveAck,
        payload,
    ))
}

pub fn construct_diagnostic_negative_ack(
    version: u8,
    source_address: u16,
    target_address: u16,
    nack_code: u8,
    previous_data: &[u8],
) -> Result<DoipMessage, DoipError> {
    let payload = addressed_payload(source_address, target_address, Some(nack_code), previous_data)?;
    Ok(DoipMessage::new(
        version,
        PayloadType::DiagnosticMessageNegativeAck,
        payload,
    ))
}

fn addressed_payload(
    source_address: u16,
    target_address: u16,
    code: Option<u8>,
    data: &[u8],
) -> Result<Vec<u8>, DoipError> {
    let length = layout::DIAG_ADDRESSING_LEN + usize::from(code.is_some()) + data.len();
    if u32::try_from(length).is_err() {
        return Err(DoipError::PayloadTooLarge { length });
    }
    let mut payload = Vec::with_capacity(length);
    payload.extend_from_slice(&source_address.to_be_bytes());
    payload.extend_from_slice(&target_address.to_be_bytes());
    payload.extend(code);
    payload.extend_from_slice(data);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportProtocol;
    use crate::protocols::doip::payload::{DoipPayload, RoutingActivationCode, decode_payload};
    use crate::protocols::doip::{NackCode, parse_message};

    fn round_trip(message: &DoipMessage) -> DoipPayload {
        let transport = message.payload_type().rule().transport;
        let bytes = message.to_bytes();
        let parsed = parse_message(&bytes, transport).expect("builder output must parse");
        assert_eq!(parsed.header.payload_type, message.payload_type());
        assert_eq!(parsed.payload, message.payload.as_slice());
        assert_eq!(parsed.consumed, bytes.len());
        decode_payload(&parsed.header, parsed.payload).expect("payload decodes")
    }

    #[test]
    fn identification_requests_round_trip() {
        assert_eq!(
            round_trip(&construct_vehicle_identification_request(0xff)),
            DoipPayload::VehicleIdentificationRequest
        );
        let eid = [1, 2, 3, 4, 5, 6];
        assert_eq!(
            round_trip(&construct_vehicle_identification_request_eid(0x02, eid)),
            DoipPayload::VehicleIdentificationRequestEid(eid)
        );
        let vin = *b"1HGCM82633A004352";
        assert_eq!(
            round_trip(&construct_vehicle_identification_request_vin(0x02, vin)),
            DoipPayload::VehicleIdentificationRequestVin(vin)
        );
    }

    #[test]
    fn announcement_round_trips_with_optional_sync() {
        let mut announcement = VehicleAnnouncement {
            vin: *b"1HGCM82633A004352",
            logical_address: 0x1001,
            eid: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            gid: [0x00; 6],
            further_action: 0x00,
            sync_status: None,
        };
        let message = construct_vehicle_announcement(0x02, &announcement);
        assert_eq!(message.header.payload_length, 32);
        assert_eq!(
            round_trip(&message),
            DoipPayload::VehicleAnnouncement(announcement.clone())
        );

        announcement.sync_status = Some(0x10);
        let message = construct_vehicle_announcement(0x02, &announcement);
        assert_eq!(message.header.payload_length, 33);
        assert_eq!(round_trip(&message), DoipPayload::VehicleAnnouncement(announcement));
    }

    #[test]
    fn routing_activation_round_trips() {
        let request = construct_routing_activation_request(0x02, 0x0e00, 0x00, None);
        assert_eq!(request.header.payload_length, 7);
        match round_trip(&request) {
            DoipPayload::RoutingActivationRequest(req) => {
                assert_eq!(req.source_address, 0x0e00);
                assert_eq!(req.oem_specific, None);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        let with_oem = construct_routing_activation_request(0x02, 0x0e00, 0x01, Some([9; 4]));
        assert_eq!(with_oem.header.payload_length, 11);

        let response = RoutingActivationResponse {
            tester_address: 0x0e00,
            entity_address: 0x1001,
            code: RoutingActivationCode::SuccessfullyActivated,
            oem_specific: Some([1, 2, 3, 4]),
        };
        let message = construct_routing_activation_response(0x02, &response);
        assert_eq!(message.header.payload_length, 13);
        assert_eq!(
            round_trip(&message),
            DoipPayload::RoutingActivationResponse(response)
        );
    }

    #[test]
    fn status_power_and_alive_check_round_trip() {
        assert_eq!(
            round_trip(&construct_alive_check_request(0x02)),
            DoipPayload::AliveCheckRequest
        );
        assert_eq!(
            round_trip(&construct_alive_check_response(0x02, 0x0e00)),
            DoipPayload::AliveCheckResponse {
                source_address: 0x0e00
            }
        );
        assert_eq!(
            round_trip(&construct_entity_status_request(0x02)),
            DoipPayload::EntityStatusRequest
        );
        let status = EntityStatusResponse {
            node_type: 0x00,
            max_open_sockets: 4,
            open_sockets: 1,
            max_data_size: Some(0x0000_ffff),
        };
        assert_eq!(
            round_trip(&construct_entity_status_response(0x02, &status)),
            DoipPayload::EntityStatusResponse(status)
        );
        assert_eq!(
            round_trip(&construct_power_mode_request(0x02)),
            DoipPayload::PowerModeRequest
        );
        assert_eq!(
            round_trip(&construct_power_mode_response(0x02, PowerMode::Ready)),
            DoipPayload::PowerModeResponse(PowerMode::Ready)
        );
    }

    #[test]
    fn diagnostic_messages_round_trip() {
        let message = construct_diagnostic_message(0x02, 0x0e00, 0x1001, &[0x22, 0xf1, 0x90])
            .unwrap();
        assert_eq!(
            message.to_bytes(),
            vec![
                0x02, 0xfd, 0x80, 0x01, 0x00, 0x00, 0x00, 0x07, 0x0e, 0x00, 0x10, 0x01, 0x22,
                0xf1, 0x90
            ]
        );
        match round_trip(&message) {
            DoipPayload::DiagnosticMessage(diag) => {
                assert_eq!(diag.target_address, 0x1001);
                assert_eq!(diag.user_data, vec![0x22, 0xf1, 0x90]);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let ack = construct_diagnostic_positive_ack(0x02, 0x1001, 0x0e00, &[]).unwrap();
        assert!(matches!(
            round_trip(&ack),
            DoipPayload::DiagnosticPositiveAck(ref a) if a.code == 0x00
        ));
        let nack = construct_diagnostic_negative_ack(0x02, 0x1001, 0x0e00, 0x03, &[0x22]).unwrap();
        assert!(matches!(
            round_trip(&nack),
            DoipPayload::DiagnosticNegativeAck(ref a) if a.code == 0x03 && a.previous_data == [0x22]
        ));
    }

    #[test]
    fn empty_diagnostic_user_data_is_refused() {
        assert_eq!(
            construct_diagnostic_message(0x02, 0x0e00, 0x1001, &[]),
            Err(DoipError::EmptyUserData)
        );
    }

    #[test]
    fn builder_output_is_rejected_on_the_other_transport() {
        let bytes = construct_entity_status_request(0x02).to_bytes();
        assert_eq!(
            parse_message(&bytes, TransportProtocol::Tcp),
            Err(NackCode::UnknownPayloadType)
        );
    }
}
