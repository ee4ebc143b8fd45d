//! DoIP/UDS classification of decoded frames.

use log::debug;

use crate::decode::{ErrorCode, decode_frame};
use crate::filter::FilterRule;
use crate::protocols::common::to_hex;
use crate::protocols::doip::{self, NackCode, ParsedMessage, layout as doip_layout};
use crate::protocols::uds;
use crate::record::ts_to_rfc3339;
use crate::source::PacketEvent;
use crate::{PacketRecord, ProtocolType, TransportProtocol};

/// A decoded frame waiting for classification.
///
/// Built on the capture thread so the frame buffer can be released before
/// the item crosses to a worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub record: PacketRecord,
    pub transport: Option<TransportProtocol>,
    pub payload: Vec<u8>,
}

impl WorkItem {
    pub fn from_frame(data: &[u8], captured_len: usize, ts: Option<f64>) -> Self {
        let decoded = decode_frame(data, captured_len);
        let mut record = decoded.record;
        record.timestamp = ts_to_rfc3339(ts).unwrap_or_default();
        Self {
            record,
            transport: decoded.transport,
            payload: decoded.payload.to_vec(),
        }
    }

    pub fn from_event(event: &PacketEvent) -> Self {
        Self::from_frame(&event.data, event.captured_len(), event.ts)
    }
}

/// Turn one work item into the records it yields.
///
/// The addressing filter runs first; rejected items yield nothing. Each
/// DoIP message in the transport payload becomes its own record. Bytes left
/// over after at least one message are reported as `IncompletePacketError`.
/// The protocol filter runs last, on the classified records.
pub fn classify(item: WorkItem, filter: &FilterRule, max_doip_payload: u32) -> Vec<PacketRecord> {
    if !filter.matches_addressing(&item.record) {
        return Vec::new();
    }
    let mut records = match item.transport {
        Some(transport) if !item.payload.is_empty() => {
            split_doip(item.record, transport, &item.payload, max_doip_payload)
        }
        _ => vec![item.record],
    };
    records.retain(|record| filter.matches_protocol(record));
    records
}

fn split_doip(
    base: PacketRecord,
    transport: TransportProtocol,
    payload: &[u8],
    max_doip_payload: u32,
) -> Vec<PacketRecord> {
    let mut records = Vec::new();
    let mut offset = 0;
    let mut first_nack = None;

    while payload.len() - offset >= doip_layout::HEADER_LEN {
        match doip::parse_message_limited(&payload[offset..], transport, max_doip_payload) {
            Ok(message) => {
                offset += message.consumed;
                records.push(doip_record(&base, &message));
            }
            Err(nack) => {
                first_nack = Some(nack);
                break;
            }
        }
    }

    if records.is_empty() {
        let mut record = base;
        if is_doip_port(&record) {
            let nack = first_nack.unwrap_or(NackCode::IncorrectPatternFormat);
            debug!(
                "DoIP framing rejected on {}:{} -> {}:{}: {nack}",
                record.src_ip, record.src_port, record.dst_ip, record.dst_port
            );
            record.doip_nack = Some(nack.as_str().to_string());
        }
        return vec![record];
    }

    if offset < payload.len() {
        let remainder = &payload[offset..];
        let mut record = base;
        record.error = ErrorCode::IncompletePacketError;
        record.error_detail = format!(
            "{} trailing bytes after {} DoIP message(s) do not form a message",
            remainder.len(),
            records.len()
        );
        record.payload_length = remainder.len();
        record.payload = to_hex(remainder);
        record.doip_nack = first_nack.map(|nack| nack.as_str().to_string());
        records.push(record);
    }
    records
}

fn doip_record(base: &PacketRecord, message: &ParsedMessage<'_>) -> PacketRecord {
    let payload_type = message.header.payload_type;
    let mut record = base.clone();
    record.protocol = ProtocolType::Doip;
    record.doip_payload_type = Some(payload_type.as_u16());
    record.payload_length = message.payload.len();
    record.payload = to_hex(message.payload);
    if let Some(sid) = uds::service_id(payload_type, message.payload) {
        record.protocol = ProtocolType::Uds;
        record.uds_service = Some(sid);
    }
    record
}

fn is_doip_port(record: &PacketRecord) -> bool {
    record.src_port == doip::DOIP_PORT || record.dst_port == doip::DOIP_PORT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::doip::{
        DEFAULT_PROTOCOL_VERSION as V, construct_alive_check_request, construct_diagnostic_message,
        construct_vehicle_identification_request,
    };
    use etherparse::PacketBuilder;

    const MAX: u32 = doip_layout::DEFAULT_MAX_PAYLOAD_LEN;

    fn tcp_item(src_port: u16, dst_port: u16, payload: &[u8]) -> WorkItem {
        let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
            .ipv4([192, 168, 0, 10], [192, 168, 0, 20], 64)
            .tcp(src_port, dst_port, 1, 1024);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        WorkItem::from_frame(&frame, frame.len(), Some(1_700_000_000.0))
    }

    fn udp_item(payload: &[u8]) -> WorkItem {
        let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [0xff; 6])
            .ipv4([192, 168, 0, 10], [255, 255, 255, 255], 64)
            .udp(50000, 13400);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        WorkItem::from_frame(&frame, frame.len(), None)
    }

    fn read_vin() -> Vec<u8> {
        construct_diagnostic_message(V, 0x0e00, 0x1001, &[0x22, 0xf1, 0x90])
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn plain_tcp_passes_through() {
        let records = classify(tcp_item(40000, 80, b"GET /"), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].protocol, ProtocolType::Tcp);
        assert_eq!(records[0].doip_nack, None);
        assert_eq!(records[0].timestamp, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn diagnostic_message_with_known_sid_is_uds() {
        let records = classify(tcp_item(40000, 13400, &read_vin()), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.protocol, ProtocolType::Uds);
        assert_eq!(record.doip_payload_type, Some(0x8001));
        assert_eq!(record.uds_service, Some(0x22));
        assert_eq!(record.payload, "0e00100122f190");
        assert_eq!(record.payload_length, 7);
    }

    #[test]
    fn several_messages_in_one_segment_become_several_records() {
        let mut payload = construct_alive_check_request(V).to_bytes();
        payload.extend(read_vin());
        let records = classify(tcp_item(13400, 40000, &payload), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].protocol, ProtocolType::Doip);
        assert_eq!(records[0].doip_payload_type, Some(0x0007));
        assert_eq!(records[1].protocol, ProtocolType::Uds);
    }

    #[test]
    fn trailing_bytes_are_an_incomplete_packet() {
        let mut payload = read_vin();
        payload.extend_from_slice(&[0x02, 0xfd, 0x80]);
        let records = classify(tcp_item(40000, 13400, &payload), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 2);
        let tail = &records[1];
        assert_eq!(tail.error, ErrorCode::IncompletePacketError);
        assert_eq!(tail.payload, "02fd80");
        assert_eq!(tail.payload_length, 3);
    }

    #[test]
    fn bad_framing_on_doip_port_records_the_nack() {
        let mut payload = read_vin();
        payload[1] = 0x00;
        let records = classify(tcp_item(40000, 13400, &payload), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].protocol, ProtocolType::Tcp);
        assert_eq!(records[0].doip_nack.as_deref(), Some("IncorrectPatternFormat"));
        assert_eq!(records[0].uds_service, None);
    }

    #[test]
    fn tcp_only_type_over_udp_is_not_doip() {
        let records = classify(udp_item(&read_vin()), &FilterRule::default(), MAX);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].protocol, ProtocolType::Udp);
        assert_eq!(records[0].doip_nack.as_deref(), Some("UnknownPayloadType"));

        let ident = construct_vehicle_identification_request(0xff).to_bytes();
        let records = classify(udp_item(&ident), &FilterRule::default(), MAX);
        assert_eq!(records[0].protocol, ProtocolType::Doip);
        assert_eq!(records[0].doip_payload_type, Some(0x0001));
    }

    #[test]
    fn filters_run_before_and_after_classification() {
        let wrong_port = FilterRule {
            port: Some(80),
            ..FilterRule::default()
        };
        assert!(classify(tcp_item(40000, 13400, &read_vin()), &wrong_port, MAX).is_empty());

        let doip_only = FilterRule {
            protocol: Some(ProtocolType::Doip),
            ..FilterRule::default()
        };
        assert_eq!(
            classify(tcp_item(40000, 13400, &read_vin()), &doip_only, MAX).len(),
            1
        );
        assert!(classify(tcp_item(40000, 80, b"GET /"), &doip_only, MAX).is_empty());
    }

    #[test]
    fn decode_errors_are_still_delivered() {
        let item = WorkItem::from_frame(&[0u8; 20], 20, None);
        let records = classify(item, &FilterRule::default(), MAX);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error, ErrorCode::SnapLengthError);
    }
}
