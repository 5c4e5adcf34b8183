//! MSB-first bit reader used by the pixel-code decoders.

use super::{DecodeError, DecodeResult};

/// Bit-level cursor over a byte slice.
///
/// Reads never partially consume: a read that would run past the end of the
/// buffer fails with [`DecodeError::OutOfData`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Number of unread bits.
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Index of the byte holding the next unread bit.
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.bit_pos / 8
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    #[inline]
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Skip to the start of the next byte unless already aligned.
    #[inline]
    pub fn align_to_byte(&mut self) {
        let aligned = (self.bit_pos + 7) & !7;
        self.bit_pos = aligned.min(self.data.len() * 8);
    }

    fn ensure(&self, bits: usize) -> DecodeResult<()> {
        let remaining = self.remaining_bits();
        if bits > remaining {
            return Err(DecodeError::OutOfData {
                requested: bits,
                remaining,
            });
        }
        Ok(())
    }

    /// Read `n` bits (at most 32) without consuming them.
    pub fn peek_bits(&self, n: u32) -> DecodeResult<u32> {
        debug_assert!(n <= 32);
        self.ensure(n as usize)?;

        let mut value = 0u32;
        let mut pos = self.bit_pos;
        for _ in 0..n {
            let byte = self.data[pos >> 3];
            let bit = (byte >> (7 - (pos & 7))) & 1;
            value = (value << 1) | bit as u32;
            pos += 1;
        }
        Ok(value)
    }

    /// Read `n` bits (at most 32), most significant first.
    pub fn read_bits(&mut self, n: u32) -> DecodeResult<u32> {
        let value = self.peek_bits(n)?;
        self.bit_pos += n as usize;
        Ok(value)
    }

    #[inline]
    pub fn read_bit(&mut self) -> DecodeResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Align to the next byte boundary, then borrow `n` whole bytes.
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let mut aligned = self.clone();
        aligned.align_to_byte();
        aligned.ensure(n * 8)?;

        let start = aligned.byte_offset();
        self.bit_pos = (start + n) * 8;
        Ok(&self.data[start..start + n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let data = [0b1010_1100, 0b0101_0011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(3).unwrap(), 0b010);
        assert_eq!(reader.read_bits(6).unwrap(), 0b1100_01);
        assert_eq!(reader.byte_offset(), 1);
        assert_eq!(reader.remaining_bits(), 6);
        assert_eq!(reader.read_bits(6).unwrap(), 0b01_0011);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0xF0];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.peek_bits(4).unwrap(), 0xF);
        assert_eq!(reader.peek_bits(4).unwrap(), 0xF);
        assert_eq!(reader.read_bits(8).unwrap(), 0xF0);
    }

    #[test]
    fn test_out_of_data_leaves_cursor() {
        let data = [0xAB];
        let mut reader = BitReader::new(&data);
        reader.read_bits(5).unwrap();
        assert_eq!(
            reader.read_bits(4),
            Err(DecodeError::OutOfData { requested: 4, remaining: 3 })
        );
        assert_eq!(reader.bit_position(), 5);
        assert_eq!(reader.read_bits(3).unwrap(), 0b011);
    }

    #[test]
    fn test_read_bytes_aligns() {
        let data = [0xFF, 0x12, 0x34];
        let mut reader = BitReader::new(&data);
        reader.read_bits(3).unwrap();
        assert!(!reader.is_byte_aligned());
        assert_eq!(reader.read_bytes(2).unwrap(), &[0x12, 0x34]);
        assert!(reader.is_exhausted());
        assert!(reader.read_bytes(1).is_err());
    }
}
