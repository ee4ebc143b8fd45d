use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decode outcome attached to every [`PacketRecord`](crate::PacketRecord).
///
/// The structural kinds are produced by [`decode`](crate::decode::decode);
/// the `Invalid*`/`IpTtlExpired` kinds come from the separately invocable
/// header checks in [`validate`](crate::decode::validate).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ErrorCode {
    #[default]
    NoError,
    SnapLengthError,
    EthernetTypeUnknown,
    Ipv4HeaderLostError,
    Ipv6HeaderLostError,
    TcpHeaderLostError,
    UdpHeaderLostError,
    HeaderOffsetError,
    TcpPayloadLostError,
    UdpPayloadLostError,
    IncompletePacketError,
    InvalidIpVersion,
    InvalidIpHeaderLength,
    InvalidIpTotalLength,
    IpTtlExpired,
    InvalidIpChecksum,
    InvalidTcpPort,
    InvalidTcpHeaderLength,
    InvalidTcpChecksum,
}

impl ErrorCode {
    pub fn is_error(self) -> bool {
        self != ErrorCode::NoError
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoError => "NoError",
            ErrorCode::SnapLengthError => "SnapLengthError",
            ErrorCode::EthernetTypeUnknown => "EthernetTypeUnknown",
            ErrorCode::Ipv4HeaderLostError => "Ipv4HeaderLostError",
            ErrorCode::Ipv6HeaderLostError => "Ipv6HeaderLostError",
            ErrorCode::TcpHeaderLostError => "TcpHeaderLostError",
            ErrorCode::UdpHeaderLostError => "UdpHeaderLostError",
            ErrorCode::HeaderOffsetError => "HeaderOffsetError",
            ErrorCode::TcpPayloadLostError => "TcpPayloadLostError",
            ErrorCode::UdpPayloadLostError => "UdpPayloadLostError",
            ErrorCode::IncompletePacketError => "IncompletePacketError",
            ErrorCode::InvalidIpVersion => "InvalidIpVersion",
            ErrorCode::InvalidIpHeaderLength => "InvalidIpHeaderLength",
            ErrorCode::InvalidIpTotalLength => "InvalidIpTotalLength",
            ErrorCode::IpTtlExpired => "IpTtlExpired",
            ErrorCode::InvalidIpChecksum => "InvalidIpChecksum",
            ErrorCode::InvalidTcpPort => "InvalidTcpPort",
            ErrorCode::InvalidTcpHeaderLength => "InvalidTcpHeaderLength",
            ErrorCode::InvalidTcpChecksum => "InvalidTcpChecksum",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by bounds-checked header reads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}

/// First failure met while walking the layers of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayerError {
    pub code: ErrorCode,
    pub detail: String,
}

impl LayerError {
    pub(crate) fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Map a read failure onto the layer that was being decoded.
    pub(crate) fn lost(code: ErrorCode) -> impl FnOnce(ReadError) -> LayerError {
        move |err| LayerError::new(code, err.to_string())
    }
}
