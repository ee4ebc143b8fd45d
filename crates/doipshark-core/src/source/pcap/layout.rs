pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;
/// Section header block type, first four bytes of every PCAPNG file.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
/// `if_tsresol` when the option is absent: microseconds.
pub const DEFAULT_TSRESOL: u8 = 6;
/// Set in `if_tsresol` when the exponent is a power of two.
pub const TSRESOL_BINARY_FLAG: u8 = 0x80;
pub const MICROS_PER_SECOND: u64 = 1_000_000;
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
