use std::ops::Range;

use crate::decode::FrameReader;

use super::error::DoipError;

/// Field access over one DoIP payload (header already stripped).
#[derive(Clone, Copy)]
pub struct DoipReader<'a> {
    inner: FrameReader<'a>,
}

impl<'a> DoipReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            inner: FrameReader::new(payload),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DoipError> {
        Ok(self.inner.require_len(needed)?)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DoipError> {
        Ok(self.inner.read_u8(offset)?)
    }

    /// Logical addresses are big-endian u16 on the wire.
    pub fn read_address(&self, range: Range<usize>) -> Result<u16, DoipError> {
        Ok(self.inner.read_u16_be(range)?)
    }

    pub fn read_u32_be(&self, range: Range<usize>) -> Result<u32, DoipError> {
        let bytes: [u8; 4] = self.inner.read_array(range)?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_array<const N: usize>(&self, range: Range<usize>) -> Result<[u8; N], DoipError> {
        Ok(self.inner.read_array(range)?)
    }

    /// Optional trailing byte: `None` when the payload stops before it.
    pub fn read_optional_u8(&self, offset: usize) -> Option<u8> {
        self.inner.read_u8(offset).ok()
    }

    /// Optional trailing block (OEM-specific data, max data size).
    pub fn read_optional_array<const N: usize>(&self, range: Range<usize>) -> Option<[u8; N]> {
        self.inner.read_array(range).ok()
    }

    pub fn rest(&self, offset: usize) -> &'a [u8] {
        self.inner.rest(offset)
    }
}
