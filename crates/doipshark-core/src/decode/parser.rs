use std::net::{Ipv4Addr, Ipv6Addr};

use crate::protocols::common::{format_mac, to_hex};
use crate::{PacketRecord, ProtocolType, TransportProtocol};

use super::error::{ErrorCode, LayerError};
use super::layout;
use super::reader::FrameReader;

/// Decoded record plus the transport payload it points at.
///
/// `payload` is empty unless the frame decoded cleanly down to TCP or UDP.
#[derive(Debug)]
pub struct DecodedFrame<'a> {
    pub record: PacketRecord,
    pub transport: Option<TransportProtocol>,
    pub payload: &'a [u8],
}

/// Decode an Ethernet frame into a [`PacketRecord`].
///
/// Never fails: the first layer that cannot be decoded sets `record.error`
/// and decoding stops there. Fields filled before the failure are kept.
pub fn decode(data: &[u8], captured_len: usize) -> PacketRecord {
    decode_frame(data, captured_len).record
}

/// Same as [`decode`], also returning the TCP/UDP payload slice.
pub fn decode_frame(data: &[u8], captured_len: usize) -> DecodedFrame<'_> {
    let data = &data[..captured_len.min(data.len())];
    let mut record = PacketRecord::default();
    match decode_layers(data, &mut record) {
        Ok(Some((transport, payload))) => DecodedFrame {
            record,
            transport: Some(transport),
            payload,
        },
        Ok(None) => DecodedFrame {
            record,
            transport: None,
            payload: &[],
        },
        Err(err) => {
            record.error = err.code;
            record.error_detail = err.detail;
            DecodedFrame {
                record,
                transport: None,
                payload: &[],
            }
        }
    }
}

/// IP layer view: protocol number, declared payload size and the payload
/// bytes actually present (clipped to the declared datagram end).
struct IpPayload<'a> {
    protocol: u8,
    declared_len: usize,
    bytes: FrameReader<'a>,
}

type Transport<'a> = Option<(TransportProtocol, &'a [u8])>;

fn decode_layers<'a>(
    data: &'a [u8],
    record: &mut PacketRecord,
) -> Result<Transport<'a>, LayerError> {
    check_snap_length(data)?;
    let frame = FrameReader::new(data);

    let ether_type = decode_ethernet(&frame, record)?;
    let ip = match ether_type {
        layout::ETHER_TYPE_IPV4 => decode_ipv4(&frame, record)?,
        layout::ETHER_TYPE_IPV6 => decode_ipv6(&frame, record)?,
        other => {
            return Err(LayerError::new(
                ErrorCode::EthernetTypeUnknown,
                format!("unsupported EtherType 0x{other:04x}"),
            ));
        }
    };

    match ip.protocol {
        layout::IP_PROTOCOL_TCP => decode_tcp(ip, record).map(Some),
        layout::IP_PROTOCOL_UDP => decode_udp(ip, record).map(Some),
        _ => Ok(None),
    }
}

fn check_snap_length(data: &[u8]) -> Result<(), LayerError> {
    if data.is_empty() {
        return Err(LayerError::new(ErrorCode::SnapLengthError, "frame is empty"));
    }
    if data.len() < layout::MIN_FRAME_LEN {
        return Err(LayerError::new(
            ErrorCode::SnapLengthError,
            format!(
                "frame too short: need {} bytes, got {}",
                layout::MIN_FRAME_LEN,
                data.len()
            ),
        ));
    }
    Ok(())
}

fn decode_ethernet(frame: &FrameReader<'_>, record: &mut PacketRecord) -> Result<u16, LayerError> {
    let lost = LayerError::lost(ErrorCode::SnapLengthError);
    let dst = frame.read_slice(layout::DST_MAC_RANGE).map_err(lost)?;
    record.dst_mac = format_mac(dst);
    let src = frame
        .read_slice(layout::SRC_MAC_RANGE)
        .map_err(LayerError::lost(ErrorCode::SnapLengthError))?;
    record.src_mac = format_mac(src);
    frame
        .read_u16_be(layout::ETHER_TYPE_RANGE)
        .map_err(LayerError::lost(ErrorCode::SnapLengthError))
}

fn decode_ipv4<'a>(
    frame: &FrameReader<'a>,
    record: &mut PacketRecord,
) -> Result<IpPayload<'a>, LayerError> {
    let code = ErrorCode::Ipv4HeaderLostError;
    frame
        .require_len(layout::IPV4_MIN_FRAME_LEN)
        .map_err(LayerError::lost(code))?;
    record.protocol = ProtocolType::Ipv4;

    let ip = FrameReader::new(frame.rest(layout::ETHERNET_HEADER_LEN));
    let version_ihl = ip
        .read_u8(layout::IPV4_VERSION_IHL_OFFSET)
        .map_err(LayerError::lost(code))?;
    let header_len = usize::from(version_ihl & 0x0f) * 4;
    let protocol = ip
        .read_u8(layout::IPV4_PROTOCOL_OFFSET)
        .map_err(LayerError::lost(code))?;
    let src: [u8; 4] = ip
        .read_array(layout::IPV4_SRC_RANGE)
        .map_err(LayerError::lost(code))?;
    let dst: [u8; 4] = ip
        .read_array(layout::IPV4_DST_RANGE)
        .map_err(LayerError::lost(code))?;
    record.src_ip = Ipv4Addr::from(src).to_string();
    record.dst_ip = Ipv4Addr::from(dst).to_string();
    let total_len = usize::from(
        ip.read_u16_be(layout::IPV4_TOTAL_LEN_RANGE)
            .map_err(LayerError::lost(code))?,
    );

    if header_len < layout::IPV4_MIN_HEADER_LEN || header_len > ip.len() {
        return Err(LayerError::new(
            code,
            format!(
                "IPv4 header length {header_len} outside 20..={} captured bytes",
                ip.len()
            ),
        ));
    }
    let declared_len = total_len.checked_sub(header_len).ok_or_else(|| {
        LayerError::new(
            code,
            format!("IPv4 total length {total_len} below header length {header_len}"),
        )
    })?;
    record.payload_length = declared_len;

    let bytes = ip
        .window(header_len, declared_len)
        .map_err(LayerError::lost(code))?;
    Ok(IpPayload {
        protocol,
        declared_len,
        bytes,
    })
}

fn decode_ipv6<'a>(
    frame: &FrameReader<'a>,
    record: &mut PacketRecord,
) -> Result<IpPayload<'a>, LayerError> {
    let code = ErrorCode::Ipv6HeaderLostError;
    frame
        .require_len(layout::IPV6_MIN_FRAME_LEN)
        .map_err(LayerError::lost(code))?;
    record.protocol = ProtocolType::Ipv6;

    let ip = FrameReader::new(frame.rest(layout::ETHERNET_HEADER_LEN));
    let declared_len = usize::from(
        ip.read_u16_be(layout::IPV6_PAYLOAD_LEN_RANGE)
            .map_err(LayerError::lost(code))?,
    );
    let protocol = ip
        .read_u8(layout::IPV6_NEXT_HEADER_OFFSET)
        .map_err(LayerError::lost(code))?;
    let src: [u8; 16] = ip
        .read_array(layout::IPV6_SRC_RANGE)
        .map_err(LayerError::lost(code))?;
    let dst: [u8; 16] = ip
        .read_array(layout::IPV6_DST_RANGE)
        .map_err(LayerError::lost(code))?;
    record.src_ip = Ipv6Addr::from(src).to_string();
    record.dst_ip = Ipv6Addr::from(dst).to_string();
    record.payload_length = declared_len;

    let bytes = ip
        .window(layout::IPV6_HEADER_LEN, declared_len)
        .map_err(LayerError::lost(code))?;
    Ok(IpPayload {
        protocol,
        declared_len,
        bytes,
    })
}

fn decode_tcp<'a>(
    ip: IpPayload<'a>,
    record: &mut PacketRecord,
) -> Result<(TransportProtocol, &'a [u8]), LayerError> {
    let segment = ip.bytes;
    segment
        .require_len(layout::TCP_MIN_HEADER_LEN)
        .map_err(LayerError::lost(ErrorCode::TcpHeaderLostError))?;
    record.protocol = ProtocolType::Tcp;
    record.src_port = segment
        .read_u16_be(layout::TCP_SRC_PORT_RANGE)
        .map_err(LayerError::lost(ErrorCode::TcpHeaderLostError))?;
    record.dst_port = segment
        .read_u16_be(layout::TCP_DST_PORT_RANGE)
        .map_err(LayerError::lost(ErrorCode::TcpHeaderLostError))?;

    let data_offset = segment
        .read_u8(layout::TCP_DATA_OFFSET_OFFSET)
        .map_err(LayerError::lost(ErrorCode::TcpHeaderLostError))?
        >> 4;
    if data_offset == 0 {
        return Err(LayerError::new(
            ErrorCode::HeaderOffsetError,
            "TCP data offset is zero",
        ));
    }
    let header_len = usize::from(data_offset) * 4;
    let payload_len = ip.declared_len.checked_sub(header_len).ok_or_else(|| {
        LayerError::new(
            ErrorCode::HeaderOffsetError,
            format!(
                "TCP header length {header_len} exceeds IP payload length {}",
                ip.declared_len
            ),
        )
    })?;
    segment
        .require_len(header_len)
        .map_err(LayerError::lost(ErrorCode::TcpHeaderLostError))?;
    record.payload_length = payload_len;

    let present = segment.rest(header_len);
    if payload_len > present.len() {
        record.payload = to_hex(present);
        return Err(LayerError::new(
            ErrorCode::TcpPayloadLostError,
            format!(
                "TCP payload truncated: declared {payload_len} bytes, captured {}: {}",
                present.len(),
                record.payload
            ),
        ));
    }
    let payload = &present[..payload_len];
    record.payload = to_hex(payload);
    Ok((TransportProtocol::Tcp, payload))
}

fn decode_udp<'a>(
    ip: IpPayload<'a>,
    record: &mut PacketRecord,
) -> Result<(TransportProtocol, &'a [u8]), LayerError> {
    let datagram = ip.bytes;
    let lost = ErrorCode::UdpHeaderLostError;
    datagram
        .require_len(layout::UDP_HEADER_LEN)
        .map_err(LayerError::lost(lost))?;
    record.protocol = ProtocolType::Udp;
    record.src_port = datagram
        .read_u16_be(layout::UDP_SRC_PORT_RANGE)
        .map_err(LayerError::lost(lost))?;
    record.dst_port = datagram
        .read_u16_be(layout::UDP_DST_PORT_RANGE)
        .map_err(LayerError::lost(lost))?;

    let udp_len = usize::from(
        datagram
            .read_u16_be(layout::UDP_LENGTH_RANGE)
            .map_err(LayerError::lost(lost))?,
    );
    let payload_len = udp_len.checked_sub(layout::UDP_HEADER_LEN).ok_or_else(|| {
        LayerError::new(
            lost,
            format!("UDP length field {udp_len} below header size"),
        )
    })?;
    record.payload_length = payload_len;

    let present = datagram.rest(layout::UDP_HEADER_LEN);
    if payload_len > present.len() {
        record.payload = to_hex(present);
        return Err(LayerError::new(
            ErrorCode::UdpPayloadLostError,
            format!(
                "UDP payload truncated: declared {payload_len} bytes, captured {}: {}",
                present.len(),
                record.payload
            ),
        ));
    }
    let payload = &present[..payload_len];
    record.payload = to_hex(payload);
    Ok((TransportProtocol::Udp, payload))
}
