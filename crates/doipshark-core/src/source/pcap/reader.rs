use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Read the magic bytes and rewind the reader to the start.
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Link type and clock of one PCAPNG interface description block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceClock {
    pub linktype: Linktype,
    /// Timestamp ticks per second.
    pub units_per_second: u64,
    /// Seconds added to every timestamp (`if_tsoffset`).
    pub offset_s: i64,
}

impl Default for InterfaceClock {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            units_per_second: layout::MICROS_PER_SECOND,
            offset_s: 0,
        }
    }
}

impl InterfaceClock {
    /// Build from the IDB fields; an unusable resolution falls back to
    /// microseconds.
    pub fn new(linktype: Linktype, tsresol: u8, offset_s: i64) -> Self {
        Self {
            linktype,
            units_per_second: units_per_second(tsresol).unwrap_or(layout::MICROS_PER_SECOND),
            offset_s,
        }
    }

    pub fn seconds(&self, ts_high: u32, ts_low: u32) -> f64 {
        let ticks = (u64::from(ts_high) << 32) | u64::from(ts_low);
        let whole = ticks / self.units_per_second;
        let fraction = ticks % self.units_per_second;
        self.offset_s as f64 + whole as f64 + fraction as f64 / self.units_per_second as f64
    }
}

/// Ticks per second encoded by an `if_tsresol` value.
///
/// The high bit selects a power of two, otherwise a power of ten. `None`
/// when the value overflows 64 bits.
pub fn units_per_second(tsresol: u8) -> Option<u64> {
    let exponent = u32::from(tsresol & !layout::TSRESOL_BINARY_FLAG);
    if tsresol & layout::TSRESOL_BINARY_FLAG != 0 {
        1u64.checked_shl(exponent).filter(|_| exponent < 64)
    } else {
        10u64.checked_pow(exponent)
    }
}

/// Interface entry for `if_id`, or an Ethernet/microsecond default.
pub fn interface_clock(interfaces: &[InterfaceClock], if_id: u32) -> InterfaceClock {
    usize::try_from(if_id)
        .ok()
        .and_then(|index| interfaces.get(index))
        .copied()
        .unwrap_or_default()
}

/// Packet bytes without the block padding PCAPNG appends after them.
pub fn captured_slice(data: &[u8], caplen: u32) -> &[u8] {
    let caplen = usize::try_from(caplen).unwrap_or(usize::MAX);
    &data[..caplen.min(data.len())]
}

/// Legacy record timestamp; the fraction is in nanoseconds for
/// `a1b23c4d` files and microseconds otherwise.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> f64 {
    let per_second = if nanosecond {
        layout::NANOS_PER_SECOND
    } else {
        layout::MICROS_PER_SECOND
    };
    f64::from(ts_sec) + f64::from(ts_frac) / per_second as f64
}
