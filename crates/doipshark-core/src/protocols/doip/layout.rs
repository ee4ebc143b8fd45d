use std::ops::Range;

/// IANA-assigned DoIP port, shared by TCP and UDP.
pub const DOIP_PORT: u16 = 13400;

// Generic header
pub const HEADER_LEN: usize = 8;
pub const VERSION_OFFSET: usize = 0;
pub const INVERSE_VERSION_OFFSET: usize = 1;
pub const PAYLOAD_TYPE_RANGE: Range<usize> = 2..4;
pub const PAYLOAD_LENGTH_RANGE: Range<usize> = 4..8;

/// ISO 13400-2:2012.
pub const DEFAULT_PROTOCOL_VERSION: u8 = 0x02;
/// Version byte allowed in vehicle identification requests.
pub const DEFAULT_ANY_VERSION: u8 = 0xFF;
pub const DEFAULT_MAX_PAYLOAD_LEN: u32 = 4 * 1024 * 1024;

pub const VIN_LEN: usize = 17;
pub const EID_LEN: usize = 6;
pub const GID_LEN: usize = 6;
pub const OEM_SPECIFIC_LEN: usize = 4;
pub const RESERVED_LEN: usize = 4;

// Vehicle announcement / identification response
pub const ANNOUNCE_VIN_RANGE: Range<usize> = 0..17;
pub const ANNOUNCE_LOGICAL_ADDRESS_RANGE: Range<usize> = 17..19;
pub const ANNOUNCE_EID_RANGE: Range<usize> = 19..25;
pub const ANNOUNCE_GID_RANGE: Range<usize> = 25..31;
pub const ANNOUNCE_FURTHER_ACTION_OFFSET: usize = 31;
pub const ANNOUNCE_SYNC_STATUS_OFFSET: usize = 32;
pub const ANNOUNCE_MIN_LEN: usize = 32;

// Routing activation request
pub const RA_REQ_SOURCE_RANGE: Range<usize> = 0..2;
pub const RA_REQ_TYPE_OFFSET: usize = 2;
pub const RA_REQ_RESERVED_RANGE: Range<usize> = 3..7;
pub const RA_REQ_OEM_RANGE: Range<usize> = 7..11;

// Routing activation response
pub const RA_RES_TESTER_RANGE: Range<usize> = 0..2;
pub const RA_RES_ENTITY_RANGE: Range<usize> = 2..4;
pub const RA_RES_CODE_OFFSET: usize = 4;
pub const RA_RES_RESERVED_RANGE: Range<usize> = 5..9;
pub const RA_RES_OEM_RANGE: Range<usize> = 9..13;

// Alive check response
pub const ALIVE_SOURCE_RANGE: Range<usize> = 0..2;

// Entity status response
pub const STATUS_NODE_TYPE_OFFSET: usize = 0;
pub const STATUS_MAX_SOCKETS_OFFSET: usize = 1;
pub const STATUS_OPEN_SOCKETS_OFFSET: usize = 2;
pub const STATUS_MAX_DATA_SIZE_RANGE: Range<usize> = 3..7;

// Power mode response
pub const POWER_MODE_OFFSET: usize = 0;

// Diagnostic message and acknowledgments
pub const DIAG_SOURCE_RANGE: Range<usize> = 0..2;
pub const DIAG_TARGET_RANGE: Range<usize> = 2..4;
/// Logical address prefix preceding user data (source + target).
pub const DIAG_ADDRESSING_LEN: usize = 4;
pub const DIAG_ACK_CODE_OFFSET: usize = 4;
pub const DIAG_ACK_PREVIOUS_OFFSET: usize = 5;

pub const DIAG_POSITIVE_ACK_CODE: u8 = 0x00;
