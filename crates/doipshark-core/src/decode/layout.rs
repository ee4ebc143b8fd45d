use std::ops::Range;

// Ethernet II
pub const ETHERNET_HEADER_LEN: usize = 14;
pub const DST_MAC_RANGE: Range<usize> = 0..6;
pub const SRC_MAC_RANGE: Range<usize> = 6..12;
pub const ETHER_TYPE_RANGE: Range<usize> = 12..14;
pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;

// Header sizes
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const TCP_MAX_DATA_OFFSET: u8 = 15;
pub const UDP_HEADER_LEN: usize = 8;

/// Smallest frame worth decoding: Ethernet + IPv4 + UDP.
pub const MIN_FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN + UDP_HEADER_LEN;
pub const IPV4_MIN_FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN;
pub const IPV6_MIN_FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN;

// IPv4, relative to the start of the IP header
pub const IPV4_VERSION_IHL_OFFSET: usize = 0;
pub const IPV4_TOTAL_LEN_RANGE: Range<usize> = 2..4;
pub const IPV4_TTL_OFFSET: usize = 8;
pub const IPV4_PROTOCOL_OFFSET: usize = 9;
pub const IPV4_CHECKSUM_RANGE: Range<usize> = 10..12;
pub const IPV4_SRC_RANGE: Range<usize> = 12..16;
pub const IPV4_DST_RANGE: Range<usize> = 16..20;
pub const IPV4_MIN_TTL: u8 = 2;

// IPv6, relative to the start of the IP header
pub const IPV6_PAYLOAD_LEN_RANGE: Range<usize> = 4..6;
pub const IPV6_NEXT_HEADER_OFFSET: usize = 6;
pub const IPV6_HOP_LIMIT_OFFSET: usize = 7;
pub const IPV6_SRC_RANGE: Range<usize> = 8..24;
pub const IPV6_DST_RANGE: Range<usize> = 24..40;

// TCP, relative to the start of the segment
pub const TCP_SRC_PORT_RANGE: Range<usize> = 0..2;
pub const TCP_DST_PORT_RANGE: Range<usize> = 2..4;
pub const TCP_DATA_OFFSET_OFFSET: usize = 12;
pub const TCP_CHECKSUM_RANGE: Range<usize> = 16..18;

// UDP, relative to the start of the datagram
pub const UDP_SRC_PORT_RANGE: Range<usize> = 0..2;
pub const UDP_DST_PORT_RANGE: Range<usize> = 2..4;
pub const UDP_LENGTH_RANGE: Range<usize> = 4..6;

pub const IP_PROTOCOL_TCP: u8 = 6;
pub const IP_PROTOCOL_UDP: u8 = 17;
