use std::fmt;

use crate::TransportProtocol;

use super::layout;

/// Payload types recognized by the codec.
///
/// Values outside this set (including the generic header NACK) are
/// reported as [`NackCode::UnknownPayloadType`](super::NackCode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadType {
    VehicleIdentificationRequest,
    VehicleIdentificationRequestEid,
    VehicleIdentificationRequestVin,
    VehicleAnnouncement,
    RoutingActivationRequest,
    RoutingActivationResponse,
    AliveCheckRequest,
    AliveCheckResponse,
    EntityStatusRequest,
    EntityStatusResponse,
    PowerModeRequest,
    PowerModeResponse,
    DiagnosticMessage,
    DiagnosticMessagePositiveAck,
    DiagnosticMessageNegativeAck,
}

/// Declared payload length constraint for one payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Exact(u32),
    Range { min: u32, max: u32 },
    AtLeast(u32),
}

impl LengthRule {
    pub fn admits(self, length: u32) -> bool {
        match self {
            LengthRule::Exact(expected) => length == expected,
            LengthRule::Range { min, max } => (min..=max).contains(&length),
            LengthRule::AtLeast(min) => length >= min,
        }
    }

    /// Smallest length the rule accepts.
    pub fn min(self) -> u32 {
        match self {
            LengthRule::Exact(len) | LengthRule::AtLeast(len) => len,
            LengthRule::Range { min, .. } => min,
        }
    }
}

/// Length and transport legality for one payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadRule {
    pub length: LengthRule,
    pub transport: TransportProtocol,
}

impl PayloadType {
    pub const ALL: [PayloadType; 15] = [
        PayloadType::VehicleIdentificationRequest,
        PayloadType::VehicleIdentificationRequestEid,
        PayloadType::VehicleIdentificationRequestVin,
        PayloadType::VehicleAnnouncement,
        PayloadType::RoutingActivationRequest,
        PayloadType::RoutingActivationResponse,
        PayloadType::AliveCheckRequest,
        PayloadType::AliveCheckResponse,
        PayloadType::EntityStatusRequest,
        PayloadType::EntityStatusResponse,
        PayloadType::PowerModeRequest,
        PayloadType::PowerModeResponse,
        PayloadType::DiagnosticMessage,
        PayloadType::DiagnosticMessagePositiveAck,
        PayloadType::DiagnosticMessageNegativeAck,
    ];

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(PayloadType::VehicleIdentificationRequest),
            0x0002 => Some(PayloadType::VehicleIdentificationRequestEid),
            0x0003 => Some(PayloadType::VehicleIdentificationRequestVin),
            0x0004 => Some(PayloadType::VehicleAnnouncement),
            0x0005 => Some(PayloadType::RoutingActivationRequest),
            0x0006 => Some(PayloadType::RoutingActivationResponse),
            0x0007 => Some(PayloadType::AliveCheckRequest),
            0x0008 => Some(PayloadType::AliveCheckResponse),
            0x4001 => Some(PayloadType::EntityStatusRequest),
            0x4002 => Some(PayloadType::EntityStatusResponse),
            0x4003 => Some(PayloadType::PowerModeRequest),
            0x4004 => Some(PayloadType::PowerModeResponse),
            0x8001 => Some(PayloadType::DiagnosticMessage),
            0x8002 => Some(PayloadType::DiagnosticMessagePositiveAck),
            0x8003 => Some(PayloadType::DiagnosticMessageNegativeAck),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            PayloadType::VehicleIdentificationRequest => 0x0001,
            PayloadType::VehicleIdentificationRequestEid => 0x0002,
            PayloadType::VehicleIdentificationRequestVin => 0x0003,
            PayloadType::VehicleAnnouncement => 0x0004,
            PayloadType::RoutingActivationRequest => 0x0005,
            PayloadType::RoutingActivationResponse => 0x0006,
            PayloadType::AliveCheckRequest => 0x0007,
            PayloadType::AliveCheckResponse => 0x0008,
            PayloadType::EntityStatusRequest => 0x4001,
            PayloadType::EntityStatusResponse => 0x4002,
            PayloadType::PowerModeRequest => 0x4003,
            PayloadType::PowerModeResponse => 0x4004,
            PayloadType::DiagnosticMessage => 0x8001,
            PayloadType::DiagnosticMessagePositiveAck => 0x8002,
            PayloadType::DiagnosticMessageNegativeAck => 0x8003,
        }
    }

    /// The interop table: length constraint and the single legal transport.
    pub fn rule(self) -> PayloadRule {
        use LengthRule::{AtLeast, Exact, Range};
        use TransportProtocol::{Tcp, Udp};

        let (length, transport) = match self {
            PayloadType::VehicleIdentificationRequest => (Exact(0), Udp),
            PayloadType::VehicleIdentificationRequestEid => (Exact(6), Udp),
            PayloadType::VehicleIdentificationRequestVin => (Exact(17), Udp),
            PayloadType::VehicleAnnouncement => (Range { min: 32, max: 33 }, Udp),
            PayloadType::RoutingActivationRequest => (Range { min: 7, max: 11 }, Tcp),
            PayloadType::RoutingActivationResponse => (Range { min: 9, max: 13 }, Tcp),
            PayloadType::AliveCheckRequest => (Exact(0), Tcp),
            PayloadType::AliveCheckResponse => (Exact(2), Tcp),
            PayloadType::EntityStatusRequest => (Exact(0), Udp),
            PayloadType::EntityStatusResponse => (Range { min: 3, max: 7 }, Udp),
            PayloadType::PowerModeRequest => (Exact(0), Udp),
            PayloadType::PowerModeResponse => (Exact(1), Udp),
            PayloadType::DiagnosticMessage => (AtLeast(5), Tcp),
            PayloadType::DiagnosticMessagePositiveAck => (AtLeast(5), Tcp),
            PayloadType::DiagnosticMessageNegativeAck => (AtLeast(5), Tcp),
        };
        PayloadRule { length, transport }
    }

    pub fn name(self) -> &'static str {
        match self {
            PayloadType::VehicleIdentificationRequest => "VehicleIdentificationRequest",
            PayloadType::VehicleIdentificationRequestEid => "VehicleIdentificationRequestEid",
            PayloadType::VehicleIdentificationRequestVin => "VehicleIdentificationRequestVin",
            PayloadType::VehicleAnnouncement => "VehicleAnnouncement",
            PayloadType::RoutingActivationRequest => "RoutingActivationRequest",
            PayloadType::RoutingActivationResponse => "RoutingActivationResponse",
            PayloadType::AliveCheckRequest => "AliveCheckRequest",
            PayloadType::AliveCheckResponse => "AliveCheckResponse",
            PayloadType::EntityStatusRequest => "EntityStatusRequest",
            PayloadType::EntityStatusResponse => "EntityStatusResponse",
            PayloadType::PowerModeRequest => "PowerModeRequest",
            PayloadType::PowerModeResponse => "PowerModeResponse",
            PayloadType::DiagnosticMessage => "DiagnosticMessage",
            PayloadType::DiagnosticMessagePositiveAck => "DiagnosticMessagePositiveAck",
            PayloadType::DiagnosticMessageNegativeAck => "DiagnosticMessageNegativeAck",
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.name(), self.as_u16())
    }
}

/// Validated 8-byte generic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoipHeader {
    pub version: u8,
    pub inverse_version: u8,
    pub payload_type: PayloadType,
    pub payload_length: u32,
}

impl DoipHeader {
    pub fn new(version: u8, payload_type: PayloadType, payload_length: u32) -> Self {
        Self {
            version,
            inverse_version: !version,
            payload_type,
            payload_length,
        }
    }

    pub fn to_bytes(&self) -> [u8; layout::HEADER_LEN] {
        let mut bytes = [0u8; layout::HEADER_LEN];
        bytes[layout::VERSION_OFFSET] = self.version;
        bytes[layout::INVERSE_VERSION_OFFSET] = self.inverse_version;
        bytes[layout::PAYLOAD_TYPE_RANGE].copy_from_slice(&self.payload_type.as_u16().to_be_bytes());
        bytes[layout::PAYLOAD_LENGTH_RANGE].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes
    }
}

/// An owned DoIP message as produced by the builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoipMessage {
    pub header: DoipHeader,
    pub payload: Vec<u8>,
}

impl DoipMessage {
    /// Wrap `payload`, filling the header length from it.
    ///
    /// Payloads longer than `u32::MAX` are rejected by the builders before
    /// reaching this point.
    pub(crate) fn new(version: u8, payload_type: PayloadType, payload: Vec<u8>) -> Self {
        let length = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        Self {
            header: DoipHeader::new(version, payload_type, length),
            payload,
        }
    }

    pub fn payload_type(&self) -> PayloadType {
        self.header.payload_type
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(layout::HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

/// A message parsed in place from a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedMessage<'a> {
    pub header: DoipHeader,
    pub payload: &'a [u8],
    /// Header plus payload bytes taken from the input.
    pub consumed: usize,
}
