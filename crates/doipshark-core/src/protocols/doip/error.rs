use thiserror::Error;

use crate::decode::ReadError;

use super::message::PayloadType;

/// Generic header NACK reasons (ISO 13400-2 table 19).
///
/// # Examples
/// ```
/// use doipshark_core::protocols::doip::NackCode;
///
/// assert_eq!(NackCode::InvalidPayloadLength.code(), 0x04);
/// assert_eq!(NackCode::from_code(0x01), Some(NackCode::UnknownPayloadType));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NackCode {
    #[error("incorrect pattern format")]
    IncorrectPatternFormat,
    #[error("unknown payload type")]
    UnknownPayloadType,
    #[error("message too large")]
    MessageTooLarge,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid payload length")]
    InvalidPayloadLength,
}

impl NackCode {
    pub fn code(self) -> u8 {
        match self {
            NackCode::IncorrectPatternFormat => 0x00,
            NackCode::UnknownPayloadType => 0x01,
            NackCode::MessageTooLarge => 0x02,
            NackCode::OutOfMemory => 0x03,
            NackCode::InvalidPayloadLength => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(NackCode::IncorrectPatternFormat),
            0x01 => Some(NackCode::UnknownPayloadType),
            0x02 => Some(NackCode::MessageTooLarge),
            0x03 => Some(NackCode::OutOfMemory),
            0x04 => Some(NackCode::InvalidPayloadLength),
            _ => None,
        }
    }

    /// Stable identifier used in records and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            NackCode::IncorrectPatternFormat => "IncorrectPatternFormat",
            NackCode::UnknownPayloadType => "UnknownPayloadType",
            NackCode::MessageTooLarge => "MessageTooLarge",
            NackCode::OutOfMemory => "OutOfMemory",
            NackCode::InvalidPayloadLength => "InvalidPayloadLength",
        }
    }
}

/// Errors returned while decoding or building DoIP payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoipError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("expected {expected} payload, got {actual}")]
    UnexpectedPayloadType {
        expected: PayloadType,
        actual: PayloadType,
    },
    #[error("diagnostic message requires at least one byte of user data")]
    EmptyUserData,
    #[error("payload of {length} bytes does not fit the DoIP length field")]
    PayloadTooLarge { length: usize },
    #[error("DoIP header rejected: {0}")]
    Nack(#[from] NackCode),
}

impl From<ReadError> for DoipError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::TooShort { needed, actual } => DoipError::TooShort { needed, actual },
        }
    }
}
