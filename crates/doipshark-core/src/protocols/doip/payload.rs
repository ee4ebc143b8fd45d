use super::error::DoipError;
use super::layout;
use super::message::{DoipHeader, PayloadType};
use super::reader::DoipReader;

/// Routing activation response codes (ISO 13400-2 table 25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingActivationCode {
    UnknownSourceAddress,
    AllSocketsRegistered,
    SourceAddressMismatch,
    SourceAddressAlreadyActive,
    MissingAuthentication,
    ConfirmationRejected,
    UnsupportedActivationType,
    SuccessfullyActivated,
    ConfirmationRequired,
    Reserved(u8),
}

impl RoutingActivationCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x00 => RoutingActivationCode::UnknownSourceAddress,
            0x01 => RoutingActivationCode::AllSocketsRegistered,
            0x02 => RoutingActivationCode::SourceAddressMismatch,
            0x03 => RoutingActivationCode::SourceAddressAlreadyActive,
            0x04 => RoutingActivationCode::MissingAuthentication,
            0x05 => RoutingActivationCode::ConfirmationRejected,
            0x06 => RoutingActivationCode::UnsupportedActivationType,
            0x10 => RoutingActivationCode::SuccessfullyActivated,
            0x11 => RoutingActivationCode::ConfirmationRequired,
            other => RoutingActivationCode::Reserved(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            RoutingActivationCode::UnknownSourceAddress => 0x00,
            RoutingActivationCode::AllSocketsRegistered => 0x01,
            RoutingActivationCode::SourceAddressMismatch => 0x02,
            RoutingActivationCode::SourceAddressAlreadyActive => 0x03,
            RoutingActivationCode::MissingAuthentication => 0x04,
            RoutingActivationCode::ConfirmationRejected => 0x05,
            RoutingActivationCode::UnsupportedActivationType => 0x06,
            RoutingActivationCode::SuccessfullyActivated => 0x10,
            RoutingActivationCode::ConfirmationRequired => 0x11,
            RoutingActivationCode::Reserved(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == RoutingActivationCode::SuccessfullyActivated
    }

    pub fn description(self) -> &'static str {
        match self {
            RoutingActivationCode::UnknownSourceAddress => "unknown source address",
            RoutingActivationCode::AllSocketsRegistered => "all sockets registered and active",
            RoutingActivationCode::SourceAddressMismatch => "source address mismatch",
            RoutingActivationCode::SourceAddressAlreadyActive => "source address already active",
            RoutingActivationCode::MissingAuthentication => "missing authentication",
            RoutingActivationCode::ConfirmationRejected => "confirmation rejected",
            RoutingActivationCode::UnsupportedActivationType => "unsupported activation type",
            RoutingActivationCode::SuccessfullyActivated => "successfully activated",
            RoutingActivationCode::ConfirmationRequired => "confirmation required",
            RoutingActivationCode::Reserved(_) => "reserved code",
        }
    }
}

/// Power mode reported by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    NotReady,
    Ready,
    NotSupported,
    Reserved(u8),
}

impl PowerMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => PowerMode::NotReady,
            0x01 => PowerMode::Ready,
            0x02 => PowerMode::NotSupported,
            other => PowerMode::Reserved(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            PowerMode::NotReady => 0x00,
            PowerMode::Ready => 0x01,
            PowerMode::NotSupported => 0x02,
            PowerMode::Reserved(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleAnnouncement {
    pub vin: [u8; layout::VIN_LEN],
    pub logical_address: u16,
    pub eid: [u8; layout::EID_LEN],
    pub gid: [u8; layout::GID_LEN],
    pub further_action: u8,
    pub sync_status: Option<u8>,
}

impl VehicleAnnouncement {
    /// VIN as text, with non-printable bytes replaced.
    pub fn vin_string(&self) -> String {
        self.vin
            .iter()
            .map(|b| if b.is_ascii_graphic() { *b as char } else { '.' })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingActivationRequest {
    pub source_address: u16,
    pub activation_type: u8,
    pub oem_specific: Option<[u8; layout::OEM_SPECIFIC_LEN]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingActivationResponse {
    pub tester_address: u16,
    pub entity_address: u16,
    pub code: RoutingActivationCode,
    pub oem_specific: Option<[u8; layout::OEM_SPECIFIC_LEN]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityStatusResponse {
    /// 0x00 gateway, 0x01 node.
    pub node_type: u8,
    pub max_open_sockets: u8,
    pub open_sockets: u8,
    pub max_data_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub source_address: u16,
    pub target_address: u16,
    pub user_data: Vec<u8>,
}

/// Positive or negative diagnostic message acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticAck {
    pub source_address: u16,
    pub target_address: u16,
    pub code: u8,
    /// Echo of the acknowledged message, possibly empty.
    pub previous_data: Vec<u8>,
}

/// Reason text for a diagnostic message negative acknowledgment code.
pub fn diagnostic_nack_reason(code: u8) -> &'static str {
    match code {
        0x02 => "invalid source address",
        0x03 => "unknown target address",
        0x04 => "diagnostic message too large",
        0x05 => "out of memory",
        0x06 => "target unreachable",
        0x07 => "unknown network",
        0x08 => "transport protocol error",
        _ => "reserved",
    }
}

/// Typed view of a validated DoIP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoipPayload {
    VehicleIdentificationRequest,
    VehicleIdentificationRequestEid([u8; layout::EID_LEN]),
    VehicleIdentificationRequestVin([u8; layout::VIN_LEN]),
    VehicleAnnouncement(VehicleAnnouncement),
    RoutingActivationRequest(RoutingActivationRequest),
    RoutingActivationResponse(RoutingActivationResponse),
    AliveCheckRequest,
    AliveCheckResponse { source_address: u16 },
    EntityStatusRequest,
    EntityStatusResponse(EntityStatusResponse),
    PowerModeRequest,
    PowerModeResponse(PowerMode),
    DiagnosticMessage(DiagnosticMessage),
    DiagnosticPositiveAck(DiagnosticAck),
    DiagnosticNegativeAck(DiagnosticAck),
}

/// Decode the payload of a message whose header already passed validation.
pub fn decode_payload(header: &DoipHeader, payload: &[u8]) -> Result<DoipPayload, DoipError> {
    let reader = DoipReader::new(payload);
    let decoded = match header.payload_type {
        PayloadType::VehicleIdentificationRequest => DoipPayload::VehicleIdentificationRequest,
        PayloadType::VehicleIdentificationRequestEid => {
            DoipPayload::VehicleIdentificationRequestEid(reader.read_array(0..layout::EID_LEN)?)
        }
        PayloadType::VehicleIdentificationRequestVin => {
            DoipPayload::VehicleIdentificationRequestVin(reader.read_array(0..layout::VIN_LEN)?)
        }
        PayloadType::VehicleAnnouncement => {
            DoipPayload::VehicleAnnouncement(parse_vehicle_announcement(payload)?)
        }
        PayloadType::RoutingActivationRequest => {
            DoipPayload::RoutingActivationRequest(parse_routing_activation_request(payload)?)
        }
        PayloadType::RoutingActivationResponse => {
            DoipPayload::RoutingActivationResponse(parse_routing_activation_response(payload)?)
        }
        PayloadType::AliveCheckRequest => DoipPayload::AliveCheckRequest,
        PayloadType::AliveCheckResponse => DoipPayload::AliveCheckResponse {
            source_address: reader.read_address(layout::ALIVE_SOURCE_RANGE)?,
        },
        PayloadType::EntityStatusRequest => DoipPayload::EntityStatusRequest,
        PayloadType::EntityStatusResponse => {
            DoipPayload::EntityStatusResponse(parse_entity_status_response(payload)?)
        }
        PayloadType::PowerModeRequest => DoipPayload::PowerModeRequest,
        PayloadType::PowerModeResponse => DoipPayload::PowerModeResponse(PowerMode::from_u8(
            reader.read_u8(layout::POWER_MODE_OFFSET)?,
        )),
        PayloadType::DiagnosticMessage => {
            DoipPayload::DiagnosticMessage(parse_diagnostic_message(payload)?)
        }
        PayloadType::DiagnosticMessagePositiveAck => {
            DoipPayload::DiagnosticPositiveAck(parse_diagnostic_ack(payload)?)
        }
        PayloadType::DiagnosticMessageNegativeAck => {
            DoipPayload::DiagnosticNegativeAck(parse_diagnostic_ack(payload)?)
        }
    };
    Ok(decoded)
}

/// Parse a vehicle announcement / identification response payload.
///
/// The sync-status byte is present only in 33-byte payloads.
pub fn parse_vehicle_announcement(payload: &[u8]) -> Result<VehicleAnnouncement, DoipError> {
    let reader = DoipReader::new(payload);
    reader.require_len(layout::ANNOUNCE_MIN_LEN)?;
    Ok(VehicleAnnouncement {
        vin: reader.read_array(layout::ANNOUNCE_VIN_RANGE)?,
        logical_address: reader.read_address(layout::ANNOUNCE_LOGICAL_ADDRESS_RANGE)?,
        eid: reader.read_array(layout::ANNOUNCE_EID_RANGE)?,
        gid: reader.read_array(layout::ANNOUNCE_GID_RANGE)?,
        further_action: reader.read_u8(layout::ANNOUNCE_FURTHER_ACTION_OFFSET)?,
        sync_status: reader.read_optional_u8(layout::ANNOUNCE_SYNC_STATUS_OFFSET),
    })
}

pub fn parse_routing_activation_request(
    payload: &[u8],
) -> Result<RoutingActivationRequest, DoipError> {
    let reader = DoipReader::new(payload);
    reader.require_len(layout::RA_REQ_RESERVED_RANGE.end)?;
    Ok(RoutingActivationRequest {
        source_address: reader.read_address(layout::RA_REQ_SOURCE_RANGE)?,
        activation_type: reader.read_u8(layout::RA_REQ_TYPE_OFFSET)?,
        oem_specific: reader.read_optional_array(layout::RA_REQ_OEM_RANGE),
    })
}

pub fn parse_routing_activation_response(
    payload: &[u8],
) -> Result<RoutingActivationResponse, DoipError> {
    let reader = DoipReader::new(payload);
    reader.require_len(layout::RA_RES_RESERVED_RANGE.end)?;
    Ok(RoutingActivationResponse {
        tester_address: reader.read_address(layout::RA_RES_TESTER_RANGE)?,
        entity_address: reader.read_address(layout::RA_RES_ENTITY_RANGE)?,
        code: RoutingActivationCode::from_u8(reader.read_u8(layout::RA_RES_CODE_OFFSET)?),
        oem_specific: reader.read_optional_array(layout::RA_RES_OEM_RANGE),
    })
}

pub fn parse_entity_status_response(payload: &[u8]) -> Result<EntityStatusResponse, DoipError> {
    let reader = DoipReader::new(payload);
    Ok(EntityStatusResponse {
        node_type: reader.read_u8(layout::STATUS_NODE_TYPE_OFFSET)?,
        max_open_sockets: reader.read_u8(layout::STATUS_MAX_SOCKETS_OFFSET)?,
        open_sockets: reader.read_u8(layout::STATUS_OPEN_SOCKETS_OFFSET)?,
        max_data_size: reader
            .read_optional_array(layout::STATUS_MAX_DATA_SIZE_RANGE)
            .map(u32::from_be_bytes),
    })
}

pub fn parse_diagnostic_message(payload: &[u8]) -> Result<DiagnosticMessage, DoipError> {
    let reader = DoipReader::new(payload);
    reader.require_len(layout::DIAG_ADDRESSING_LEN + 1)?;
    Ok(DiagnosticMessage {
        source_address: reader.read_address(layout::DIAG_SOURCE_RANGE)?,
        target_address: reader.read_address(layout::DIAG_TARGET_RANGE)?,
        user_data: reader.rest(layout::DIAG_ADDRESSING_LEN).to_vec(),
    })
}

pub fn parse_diagnostic_ack(payload: &[u8]) -> Result<DiagnosticAck, DoipError> {
    let reader = DoipReader::new(payload);
    Ok(DiagnosticAck {
        source_address: reader.read_address(layout::DIAG_SOURCE_RANGE)?,
        target_address: reader.read_address(layout::DIAG_TARGET_RANGE)?,
        code: reader.read_u8(layout::DIAG_ACK_CODE_OFFSET)?,
        previous_data: reader.rest(layout::DIAG_ACK_PREVIOUS_OFFSET).to_vec(),
    })
}
