use crate::TransportProtocol;
use crate::decode::FrameReader;

use super::error::NackCode;
use super::layout;
use super::message::{DoipHeader, ParsedMessage, PayloadType};

/// Validate a generic header against the payload-type table.
///
/// Checks run in order: pattern (length and version complement), maximum
/// size, payload-type/length/transport legality, available bytes.
///
/// # Examples
/// ```
/// use doipshark_core::TransportProtocol;
/// use doipshark_core::protocols::doip::{NackCode, PayloadType, parse_header};
///
/// let alive_check = [0x02, 0xfd, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00];
/// let header = parse_header(&alive_check, TransportProtocol::Tcp).unwrap();
/// assert_eq!(header.payload_type, PayloadType::AliveCheckRequest);
///
/// let err = parse_header(&alive_check, TransportProtocol::Udp).unwrap_err();
/// assert_eq!(err, NackCode::UnknownPayloadType);
/// ```
pub fn parse_header(bytes: &[u8], transport: TransportProtocol) -> Result<DoipHeader, NackCode> {
    parse_header_limited(bytes, transport, layout::DEFAULT_MAX_PAYLOAD_LEN)
}

/// [`parse_header`] with an explicit maximum payload length.
pub fn parse_header_limited(
    bytes: &[u8],
    transport: TransportProtocol,
    max_payload_len: u32,
) -> Result<DoipHeader, NackCode> {
    let reader = FrameReader::new(bytes);
    let pattern = |_| NackCode::IncorrectPatternFormat;
    reader.require_len(layout::HEADER_LEN).map_err(pattern)?;
    let version = reader.read_u8(layout::VERSION_OFFSET).map_err(pattern)?;
    let inverse_version = reader
        .read_u8(layout::INVERSE_VERSION_OFFSET)
        .map_err(pattern)?;
    if inverse_version != !version {
        return Err(NackCode::IncorrectPatternFormat);
    }

    let raw_type = reader
        .read_u16_be(layout::PAYLOAD_TYPE_RANGE)
        .map_err(pattern)?;
    let length_bytes: [u8; 4] = reader
        .read_array(layout::PAYLOAD_LENGTH_RANGE)
        .map_err(pattern)?;
    let payload_length = u32::from_be_bytes(length_bytes);
    if payload_length > max_payload_len {
        return Err(NackCode::MessageTooLarge);
    }

    let payload_type = PayloadType::from_u16(raw_type).ok_or(NackCode::UnknownPayloadType)?;
    let rule = payload_type.rule();
    if rule.transport != transport || !rule.length.admits(payload_length) {
        return Err(NackCode::UnknownPayloadType);
    }

    let available = bytes.len() - layout::HEADER_LEN;
    if usize::try_from(payload_length).map_or(true, |len| len > available) {
        return Err(NackCode::InvalidPayloadLength);
    }

    Ok(DoipHeader {
        version,
        inverse_version,
        payload_type,
        payload_length,
    })
}

/// Parse one message from the front of `bytes`.
///
/// Trailing bytes after the message are left for the caller, which walks a
/// transport payload carrying several messages by advancing `consumed`.
pub fn parse_message(
    bytes: &[u8],
    transport: TransportProtocol,
) -> Result<ParsedMessage<'_>, NackCode> {
    parse_message_limited(bytes, transport, layout::DEFAULT_MAX_PAYLOAD_LEN)
}

pub fn parse_message_limited(
    bytes: &[u8],
    transport: TransportProtocol,
    max_payload_len: u32,
) -> Result<ParsedMessage<'_>, NackCode> {
    let header = parse_header_limited(bytes, transport, max_payload_len)?;
    let consumed = layout::HEADER_LEN + header.payload_length as usize;
    Ok(ParsedMessage {
        header,
        payload: &bytes[layout::HEADER_LEN..consumed],
        consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::doip::message::LengthRule;

    fn raw(version: u8, inverse: u8, payload_type: u16, length: u32, body: usize) -> Vec<u8> {
        let mut bytes = vec![version, inverse];
        bytes.extend_from_slice(&payload_type.to_be_bytes());
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.resize(layout::HEADER_LEN + body, 0);
        bytes
    }

    fn other(transport: TransportProtocol) -> TransportProtocol {
        match transport {
            TransportProtocol::Tcp => TransportProtocol::Udp,
            TransportProtocol::Udp => TransportProtocol::Tcp,
        }
    }

    #[test]
    fn short_buffer_is_pattern_error() {
        assert_eq!(
            parse_header(&[0x02, 0xfd, 0x00], TransportProtocol::Tcp),
            Err(NackCode::IncorrectPatternFormat)
        );
    }

    #[test]
    fn version_complement_mismatch_always_fails() {
        for version in 0..=u8::MAX {
            let bad = (!version).wrapping_add(1);
            for payload_type in PayloadType::ALL {
                let rule = payload_type.rule();
                let len = rule.length.min();
                let bytes = raw(version, bad, payload_type.as_u16(), len, len as usize);
                assert_eq!(
                    parse_header(&bytes, rule.transport),
                    Err(NackCode::IncorrectPatternFormat),
                    "version {version:#04x} type {payload_type}"
                );
            }
        }
    }

    #[test]
    fn every_type_is_legal_on_exactly_one_transport() {
        for payload_type in PayloadType::ALL {
            let rule = payload_type.rule();
            let len = rule.length.min();
            let bytes = raw(0x02, 0xfd, payload_type.as_u16(), len, len as usize);
            let header = parse_header(&bytes, rule.transport).unwrap();
            assert_eq!(header.payload_type, payload_type);
            assert_eq!(
                parse_header(&bytes, other(rule.transport)),
                Err(NackCode::UnknownPayloadType),
                "{payload_type} accepted on the wrong transport"
            );
        }
    }

    #[test]
    fn one_byte_short_of_the_rule_is_rejected() {
        for payload_type in PayloadType::ALL {
            let rule = payload_type.rule();
            let min = rule.length.min();
            let transport = rule.transport;

            let short_available = raw(0x02, 0xfd, payload_type.as_u16(), min, 0);
            if min > 0 {
                assert_eq!(
                    parse_header(&short_available, transport),
                    Err(NackCode::InvalidPayloadLength),
                    "{payload_type} parsed without its payload"
                );
                let short_declared = raw(0x02, 0xfd, payload_type.as_u16(), min - 1, 64);
                assert_eq!(
                    parse_header(&short_declared, transport),
                    Err(NackCode::UnknownPayloadType),
                    "{payload_type} accepted a declared length below its minimum"
                );
            }
            if let LengthRule::Exact(len) | LengthRule::Range { max: len, .. } = rule.length {
                let long_declared = raw(0x02, 0xfd, payload_type.as_u16(), len + 1, 64);
                assert_eq!(
                    parse_header(&long_declared, transport),
                    Err(NackCode::UnknownPayloadType)
                );
            }
        }
    }

    #[test]
    fn unknown_and_generic_nack_types_are_rejected() {
        let bytes = raw(0x02, 0xfd, 0x0000, 1, 1);
        assert_eq!(
            parse_header(&bytes, TransportProtocol::Tcp),
            Err(NackCode::UnknownPayloadType)
        );
        let bytes = raw(0x02, 0xfd, 0x1234, 0, 0);
        assert_eq!(
            parse_header(&bytes, TransportProtocol::Udp),
            Err(NackCode::UnknownPayloadType)
        );
    }

    #[test]
    fn oversized_declaration_is_message_too_large() {
        let bytes = raw(0x02, 0xfd, 0x8001, 4097, 8);
        assert_eq!(
            parse_header_limited(&bytes, TransportProtocol::Tcp, 4096),
            Err(NackCode::MessageTooLarge)
        );
        let bytes = raw(0x02, 0xfd, 0x8001, u32::MAX, 0);
        assert_eq!(
            parse_header(&bytes, TransportProtocol::Tcp),
            Err(NackCode::MessageTooLarge)
        );
    }

    #[test]
    fn parse_message_reports_consumed_bytes() {
        let mut bytes = raw(0x02, 0xfd, 0x8001, 6, 6);
        bytes[8..14].copy_from_slice(&[0x0e, 0x00, 0x10, 0x01, 0x3e, 0x00]);
        bytes.extend_from_slice(&[0x02, 0xfd, 0x00]);
        let parsed = parse_message(&bytes, TransportProtocol::Tcp).unwrap();
        assert_eq!(parsed.consumed, 14);
        assert_eq!(parsed.payload, &[0x0e, 0x00, 0x10, 0x01, 0x3e, 0x00]);
        assert_eq!(
            parse_message(&bytes[parsed.consumed..], TransportProtocol::Tcp),
            Err(NackCode::IncorrectPatternFormat)
        );
    }
}
