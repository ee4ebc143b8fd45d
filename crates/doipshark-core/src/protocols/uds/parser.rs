use crate::protocols::doip::PayloadType;

use super::layout;

/// Whether a SID is a known request, positive response or negative response.
pub fn is_known_service(sid: u8) -> bool {
    sid == layout::SID_NEGATIVE_RESPONSE || request_sid(sid).is_some()
}

/// Request SID a service identifier belongs to, for requests and positive
/// responses alike.
pub fn request_sid(sid: u8) -> Option<u8> {
    let known = |candidate: u8| layout::REQUEST_SIDS.iter().any(|(id, _)| *id == candidate);
    if known(sid) {
        return Some(sid);
    }
    sid.checked_sub(layout::POSITIVE_RESPONSE_OFFSET)
        .filter(|request| known(*request))
}

pub fn is_positive_response(sid: u8) -> bool {
    !layout::REQUEST_SIDS.iter().any(|(id, _)| *id == sid) && request_sid(sid).is_some()
}

/// Whether a DoIP payload carries UDS data.
///
/// Only diagnostic messages qualify, and only when a service identifier
/// follows the 4-byte addressing prefix. Unknown SIDs are classification
/// misses, not errors.
///
/// # Examples
/// ```
/// use doipshark_core::protocols::doip::PayloadType;
/// use doipshark_core::protocols::uds::is_diagnostic_service_data;
///
/// let read_vin = [0x0e, 0x00, 0x10, 0x01, 0x22, 0xf1, 0x90];
/// assert!(is_diagnostic_service_data(PayloadType::DiagnosticMessage, &read_vin));
/// assert!(!is_diagnostic_service_data(PayloadType::DiagnosticMessagePositiveAck, &read_vin));
/// ```
pub fn is_diagnostic_service_data(payload_type: PayloadType, bytes: &[u8]) -> bool {
    payload_type == PayloadType::DiagnosticMessage
        && bytes.len() > layout::SID_OFFSET
        && is_known_service(bytes[layout::SID_OFFSET])
}

/// SID of a diagnostic message payload, when it is UDS.
pub fn service_id(payload_type: PayloadType, bytes: &[u8]) -> Option<u8> {
    is_diagnostic_service_data(payload_type, bytes).then(|| bytes[layout::SID_OFFSET])
}

/// Display name of a service identifier.
pub fn service_name(sid: u8) -> Option<&'static str> {
    if sid == layout::SID_NEGATIVE_RESPONSE {
        return Some("NegativeResponse");
    }
    let request = request_sid(sid)?;
    layout::REQUEST_SIDS
        .iter()
        .find(|(id, _)| *id == request)
        .map(|(_, name)| *name)
}
