//! Header validity checks kept off the hot decode path.
//!
//! Inputs start at the IP header (Ethernet already stripped). Use
//! [`check_frame`] to run both checks on a full Ethernet frame.

use super::error::ErrorCode;
use super::layout;
use super::reader::FrameReader;

/// Outcome of [`check_ip_header`].
///
/// A TTL (or hop limit) below 2 is reported through `ttl_expired` without
/// turning `error` into a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCheck {
    pub error: ErrorCode,
    pub ttl_expired: bool,
}

impl HeaderCheck {
    fn failed(error: ErrorCode) -> Self {
        Self {
            error,
            ttl_expired: false,
        }
    }

    /// Most specific code: the error when set, otherwise `IpTtlExpired`
    /// when flagged.
    pub fn code(&self) -> ErrorCode {
        if self.error.is_error() {
            self.error
        } else if self.ttl_expired {
            ErrorCode::IpTtlExpired
        } else {
            ErrorCode::NoError
        }
    }
}

/// Validate an IPv4 or IPv6 header.
///
/// # Examples
/// ```
/// use doipshark_core::decode::{ErrorCode, check_ip_header};
///
/// let mut header = [0u8; 20];
/// header[0] = 0x45;
/// header[3] = 20;
/// header[8] = 64;
/// assert_eq!(check_ip_header(&header).error, ErrorCode::NoError);
/// ```
pub fn check_ip_header(packet: &[u8]) -> HeaderCheck {
    let ip = FrameReader::new(packet);
    let Ok(version_ihl) = ip.read_u8(layout::IPV4_VERSION_IHL_OFFSET) else {
        return HeaderCheck::failed(ErrorCode::InvalidIpVersion);
    };
    match version_ihl >> 4 {
        4 => check_ipv4(ip, version_ihl),
        6 => check_ipv6(ip),
        _ => HeaderCheck::failed(ErrorCode::InvalidIpVersion),
    }
}

fn check_ipv4(ip: FrameReader<'_>, version_ihl: u8) -> HeaderCheck {
    let header_len = usize::from(version_ihl & 0x0f) * 4;
    if header_len < layout::IPV4_MIN_HEADER_LEN || header_len > ip.len() {
        return HeaderCheck::failed(ErrorCode::InvalidIpHeaderLength);
    }
    let total_len = match ip.read_u16_be(layout::IPV4_TOTAL_LEN_RANGE) {
        Ok(len) => usize::from(len),
        Err(_) => return HeaderCheck::failed(ErrorCode::InvalidIpTotalLength),
    };
    if total_len < layout::IPV4_MIN_HEADER_LEN || total_len > ip.len() {
        return HeaderCheck::failed(ErrorCode::InvalidIpTotalLength);
    }
    let ttl_expired = ip
        .read_u8(layout::IPV4_TTL_OFFSET)
        .map(|ttl| ttl < layout::IPV4_MIN_TTL)
        .unwrap_or(true);

    let checksum = ip.read_u16_be(layout::IPV4_CHECKSUM_RANGE).unwrap_or(0);
    let header = &ip.as_slice()[..header_len];
    let error = if checksum != 0 && ones_complement_sum(&[header]) != 0xffff {
        ErrorCode::InvalidIpChecksum
    } else {
        ErrorCode::NoError
    };
    HeaderCheck { error, ttl_expired }
}

fn check_ipv6(ip: FrameReader<'_>) -> HeaderCheck {
    if ip.len() < layout::IPV6_HEADER_LEN {
        return HeaderCheck::failed(ErrorCode::InvalidIpHeaderLength);
    }
    let total_len = ip
        .read_u16_be(layout::IPV6_PAYLOAD_LEN_RANGE)
        .map(|len| usize::from(len) + layout::IPV6_HEADER_LEN)
        .unwrap_or(usize::MAX);
    if total_len > ip.len() {
        return HeaderCheck::failed(ErrorCode::InvalidIpTotalLength);
    }
    let ttl_expired = ip
        .read_u8(layout::IPV6_HOP_LIMIT_OFFSET)
        .map(|hops| hops < layout::IPV4_MIN_TTL)
        .unwrap_or(true);
    HeaderCheck {
        error: ErrorCode::NoError,
        ttl_expired,
    }
}

/// Validate the TCP segment carried in an IPv4 packet.
///
/// Returns the IP header error when the IP header itself is invalid, and
/// `NoError` when the packet is not IPv4/TCP.
pub fn check_tcp_header(ip_packet: &[u8]) -> ErrorCode {
    let ip_check = check_ip_header(ip_packet);
    if ip_check.error.is_error() {
        return ip_check.error;
    }
    let ip = FrameReader::new(ip_packet);
    let (Ok(version_ihl), Ok(protocol)) = (
        ip.read_u8(layout::IPV4_VERSION_IHL_OFFSET),
        ip.read_u8(layout::IPV4_PROTOCOL_OFFSET),
    ) else {
        return ErrorCode::NoError;
    };
    if version_ihl >> 4 != 4 || protocol != layout::IP_PROTOCOL_TCP {
        return ErrorCode::NoError;
    }

    let header_len = usize::from(version_ihl & 0x0f) * 4;
    let total_len = ip
        .read_u16_be(layout::IPV4_TOTAL_LEN_RANGE)
        .map(usize::from)
        .unwrap_or(0);
    let Some(segment) = ip_packet.get(header_len..total_len) else {
        return ErrorCode::InvalidIpTotalLength;
    };
    let tcp = FrameReader::new(segment);
    if tcp.len() < layout::TCP_MIN_HEADER_LEN {
        return ErrorCode::InvalidTcpHeaderLength;
    }

    let src_port = tcp.read_u16_be(layout::TCP_SRC_PORT_RANGE).unwrap_or(0);
    let dst_port = tcp.read_u16_be(layout::TCP_DST_PORT_RANGE).unwrap_or(0);
    if src_port == 0 || dst_port == 0 {
        return ErrorCode::InvalidTcpPort;
    }
    let data_offset = tcp.read_u8(layout::TCP_DATA_OFFSET_OFFSET).unwrap_or(0) >> 4;
    if !(5..=layout::TCP_MAX_DATA_OFFSET).contains(&data_offset)
        || usize::from(data_offset) * 4 > segment.len()
    {
        return ErrorCode::InvalidTcpHeaderLength;
    }

    let (Ok(src), Ok(dst)) = (
        ip.read_slice(layout::IPV4_SRC_RANGE),
        ip.read_slice(layout::IPV4_DST_RANGE),
    ) else {
        return ErrorCode::InvalidIpHeaderLength;
    };
    let Ok(segment_len) = u16::try_from(segment.len()) else {
        return ErrorCode::InvalidTcpHeaderLength;
    };
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(src);
    pseudo[4..8].copy_from_slice(dst);
    pseudo[9] = layout::IP_PROTOCOL_TCP;
    pseudo[10..12].copy_from_slice(&segment_len.to_be_bytes());

    if ones_complement_sum(&[&pseudo, segment]) != 0xffff {
        return ErrorCode::InvalidTcpChecksum;
    }
    ErrorCode::NoError
}

/// Run the IP and TCP checks on a full Ethernet frame.
///
/// Frames that are not IPv4/IPv6 yield `NoError`: there is nothing to check.
pub fn check_frame(frame: &[u8]) -> ErrorCode {
    let reader = FrameReader::new(frame);
    let Ok(ether_type) = reader.read_u16_be(layout::ETHER_TYPE_RANGE) else {
        return ErrorCode::SnapLengthError;
    };
    if ether_type != layout::ETHER_TYPE_IPV4 && ether_type != layout::ETHER_TYPE_IPV6 {
        return ErrorCode::NoError;
    }
    let packet = reader.rest(layout::ETHERNET_HEADER_LEN);
    let ip = check_ip_header(packet);
    if ip.error.is_error() {
        return ip.error;
    }
    let tcp = check_tcp_header(packet);
    if tcp.is_error() {
        return tcp;
    }
    ip.code()
}

/// Internet checksum one's-complement sum (RFC 1071) over several chunks.
///
/// An odd-length chunk is padded with a zero byte. A buffer whose checksum
/// field is correct sums to `0xffff`.
pub fn ones_complement_sum(chunks: &[&[u8]]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in chunks {
        let mut words = chunk.chunks_exact(2);
        for word in words.by_ref() {
            sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        }
        if let [last] = words.remainder() {
            sum += u32::from(u16::from_be_bytes([*last, 0]));
        }
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}

/// Checksum value to store in a header whose checksum field is zeroed.
pub fn internet_checksum(chunks: &[&[u8]]) -> u16 {
    !ones_complement_sum(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    fn ipv4_header(ttl: u8) -> [u8; 20] {
        let mut header = [0u8; 20];
        header[0] = 0x45;
        header[2..4].copy_from_slice(&20u16.to_be_bytes());
        header[8] = ttl;
        header[9] = 17;
        header[12..16].copy_from_slice(&[192, 168, 1, 1]);
        header[16..20].copy_from_slice(&[192, 168, 1, 2]);
        let checksum = internet_checksum(&[&header]);
        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        header
    }

    fn tcp_packet() -> Vec<u8> {
        let builder = PacketBuilder::ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64).tcp(50000, 13400, 7, 512);
        let payload = [0x02, 0xfd, 0x80, 0x01];
        let mut packet = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();
        packet
    }

    #[test]
    fn valid_header_passes() {
        let header = ipv4_header(64);
        let check = check_ip_header(&header);
        assert_eq!(check.error, ErrorCode::NoError);
        assert!(!check.ttl_expired);
    }

    #[test]
    fn corrupted_checksum_is_flagged() {
        let mut header = ipv4_header(64);
        header[11] ^= 0x01;
        assert_eq!(check_ip_header(&header).error, ErrorCode::InvalidIpChecksum);
    }

    #[test]
    fn zero_checksum_means_not_used() {
        let mut header = ipv4_header(64);
        header[10] = 0;
        header[11] = 0;
        assert_eq!(check_ip_header(&header).error, ErrorCode::NoError);
    }

    #[test]
    fn low_ttl_is_reported_but_not_fatal() {
        let header = ipv4_header(1);
        let check = check_ip_header(&header);
        assert_eq!(check.error, ErrorCode::NoError);
        assert!(check.ttl_expired);
        assert_eq!(check.code(), ErrorCode::IpTtlExpired);
    }

    #[test]
    fn bad_version_and_lengths() {
        let mut header = ipv4_header(64);
        header[0] = 0x55;
        assert_eq!(check_ip_header(&header).error, ErrorCode::InvalidIpVersion);

        let mut header = ipv4_header(64);
        header[0] = 0x44;
        assert_eq!(
            check_ip_header(&header).error,
            ErrorCode::InvalidIpHeaderLength
        );

        let mut header = ipv4_header(64);
        header[2..4].copy_from_slice(&200u16.to_be_bytes());
        assert_eq!(
            check_ip_header(&header).error,
            ErrorCode::InvalidIpTotalLength
        );
    }

    #[test]
    fn tcp_checks_accept_well_formed_segment() {
        let packet = tcp_packet();
        assert_eq!(check_ip_header(&packet).error, ErrorCode::NoError);
        assert_eq!(check_tcp_header(&packet), ErrorCode::NoError);
    }

    #[test]
    fn tcp_zero_port_and_offset_are_rejected() {
        let mut packet = tcp_packet();
        packet[20] = 0;
        packet[21] = 0;
        assert_eq!(check_tcp_header(&packet), ErrorCode::InvalidTcpPort);

        let mut packet = tcp_packet();
        packet[32] = 0x40;
        assert_eq!(check_tcp_header(&packet), ErrorCode::InvalidTcpHeaderLength);
    }

    #[test]
    fn tcp_checksum_mismatch_is_flagged() {
        let mut packet = tcp_packet();
        let last = packet.len() - 1;
        packet[last] ^= 0xff;
        assert_eq!(check_tcp_header(&packet), ErrorCode::InvalidTcpChecksum);
    }

    #[test]
    fn odd_length_input_is_padded() {
        assert_eq!(ones_complement_sum(&[&[0x01]]), 0x0100);
        assert_eq!(ones_complement_sum(&[&[0xff, 0xff], &[0x00, 0x01]]), 0x0001);
    }
}
