use std::ops::Range;

use super::error::ReadError;

/// Bounds-checked big-endian field access over a captured buffer.
#[derive(Clone, Copy)]
pub struct FrameReader<'a> {
    data: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), ReadError> {
        if self.data.len() < needed {
            return Err(ReadError::TooShort {
                needed,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ReadError> {
        self.data.get(offset).copied().ok_or(ReadError::TooShort {
            needed: offset + 1,
            actual: self.data.len(),
        })
    }

    pub fn read_u16_be(&self, range: Range<usize>) -> Result<u16, ReadError> {
        let bytes: [u8; 2] = self.read_array(range)?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], ReadError> {
        self.data.get(range.clone()).ok_or(ReadError::TooShort {
            needed: range.end,
            actual: self.data.len(),
        })
    }

    pub fn read_array<const N: usize>(&self, range: Range<usize>) -> Result<[u8; N], ReadError> {
        let bytes = self.read_slice(range)?;
        bytes.try_into().map_err(|_| ReadError::TooShort {
            needed: N,
            actual: bytes.len(),
        })
    }

    /// Sub-reader starting at `offset`, clipped to `limit` bytes when the
    /// buffer is longer.
    pub fn window(&self, offset: usize, limit: usize) -> Result<FrameReader<'a>, ReadError> {
        self.require_len(offset)?;
        let end = offset.saturating_add(limit).min(self.data.len());
        Ok(FrameReader::new(&self.data[offset..end]))
    }

    pub fn rest(&self, offset: usize) -> &'a [u8] {
        self.data.get(offset..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::FrameReader;
    use crate::decode::error::ReadError;

    #[test]
    fn reads_big_endian_fields() {
        let data = [0x08, 0x00, 0x86, 0xdd];
        let reader = FrameReader::new(&data);
        assert_eq!(reader.read_u16_be(0..2), Ok(0x0800));
        assert_eq!(reader.read_u16_be(2..4), Ok(0x86dd));
        assert_eq!(reader.read_u8(3), Ok(0xdd));
    }

    #[test]
    fn short_reads_report_needed_length() {
        let data = [0u8; 3];
        let reader = FrameReader::new(&data);
        assert_eq!(
            reader.read_u16_be(2..4),
            Err(ReadError::TooShort {
                needed: 4,
                actual: 3
            })
        );
        assert!(reader.require_len(4).is_err());
    }

    #[test]
    fn window_clips_to_buffer() {
        let data = [1u8, 2, 3, 4, 5];
        let reader = FrameReader::new(&data);
        let window = reader.window(2, 10).unwrap();
        assert_eq!(window.as_slice(), &[3, 4, 5]);
        let window = reader.window(1, 2).unwrap();
        assert_eq!(window.as_slice(), &[2, 3]);
        assert!(reader.window(6, 1).is_err());
    }
}
