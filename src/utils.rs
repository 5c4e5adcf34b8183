//! Utility functions for binary reading, color conversion and timestamp lookup.

use std::io::Cursor;
use byteorder::{BigEndian, ReadBytesExt};

use crate::dvb::{DecodeError, DecodeResult};

/// Binary reader wrapper for big-endian segment fields.
pub struct BigEndianReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BigEndianReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    /// The error reported when `len` more bytes are requested.
    #[inline]
    fn shortfall(&self, len: usize) -> DecodeError {
        DecodeError::OutOfData {
            requested: len * 8,
            remaining: self.remaining() * 8,
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let err = self.shortfall(1);
        self.cursor.read_u8().map_err(|_| err)
    }

    #[inline]
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        if self.remaining() < 2 {
            return Err(self.shortfall(2));
        }
        let err = self.shortfall(2);
        self.cursor.read_u16::<BigEndian>().map_err(|_| err)
    }

    /// Borrow the next `len` bytes without copying.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.shortfall(len));
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.position();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    #[inline]
    pub fn skip(&mut self, len: usize) -> DecodeResult<()> {
        self.read_bytes(len).map(|_| ())
    }
}

/// Largest raster, in pixels, a region or canvas may allocate.
pub const MAX_RASTER_PIXELS: usize = 4096 * 4096;

/// Allocate a `width` x `height` raster filled with `value`.
///
/// Refused without allocating above [`MAX_RASTER_PIXELS`] pixels or when the
/// allocator cannot satisfy the request.
pub fn alloc_raster<T: Clone>(value: T, width: usize, height: usize) -> DecodeResult<Vec<T>> {
    let too_large = DecodeError::RasterTooLarge { width, height };
    let len = match width.checked_mul(height) {
        Some(len) if len <= MAX_RASTER_PIXELS => len,
        _ => return Err(too_large),
    };
    let mut raster = Vec::new();
    raster.try_reserve_exact(len).map_err(|_| too_large)?;
    raster.resize(len, value);
    Ok(raster)
}

/// Convert YCbCr to RGBA (packed as u32 in little-endian: ABGR layout for canvas).
#[inline]
pub fn ycbcr_to_rgba(y: u8, cb: u8, cr: u8, a: u8) -> u32 {
    let y = y as f32;
    let cb = (cb as f32) - 128.0;
    let cr = (cr as f32) - 128.0;

    let r = clamp((y + 1.40200 * cr).round() as i32, 0, 255) as u8;
    let g = clamp((y - 0.34414 * cb - 0.71414 * cr).round() as i32, 0, 255) as u8;
    let b = clamp((y + 1.77200 * cb).round() as i32, 0, 255) as u8;

    // Pack as RGBA (for ImageData which expects [R, G, B, A] bytes)
    // In little-endian memory: byte order is R, G, B, A
    u32::from_le_bytes([r, g, b, a])
}

/// Convert RGB to packed RGBA u32.
#[inline]
pub const fn rgb_to_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

#[inline]
pub fn clamp<T: Ord>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Fast binary search for finding timestamp index.
pub fn binary_search_timestamp(timestamps: &[u32], target: u32) -> usize {
    if timestamps.is_empty() {
        return 0;
    }

    let mut low = 0;
    let mut high = timestamps.len();

    while low < high {
        let mid = low + (high - low) / 2;
        if timestamps[mid] <= target {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    if low > 0 { low - 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_search_timestamp() {
        let timestamps = vec![0, 1000, 2000, 3000, 4000];

        assert_eq!(binary_search_timestamp(&timestamps, 0), 0);
        assert_eq!(binary_search_timestamp(&timestamps, 500), 0);
        assert_eq!(binary_search_timestamp(&timestamps, 1000), 1);
        assert_eq!(binary_search_timestamp(&timestamps, 1500), 1);
        assert_eq!(binary_search_timestamp(&timestamps, 4500), 4);
    }

    #[test]
    fn test_ycbcr_to_rgba() {
        // White (Y=255, Cb=128, Cr=128) -> RGB(255, 255, 255)
        let white = ycbcr_to_rgba(255, 128, 128, 255);
        assert_eq!(white.to_le_bytes(), [255, 255, 255, 255]);
    }

    #[test]
    fn test_reader_fields() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut reader = BigEndianReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x12);
        assert_eq!(reader.read_u16().unwrap(), 0x3456);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0x78, 0x9A]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_out_of_data() {
        let data = [0x01];
        let mut reader = BigEndianReader::new(&data);
        assert_eq!(
            reader.read_u16(),
            Err(DecodeError::OutOfData { requested: 16, remaining: 8 })
        );
        // A failed read leaves the position untouched
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert!(reader.read_bytes(1).is_err());
    }

    #[test]
    fn test_alloc_raster_limits() {
        assert_eq!(alloc_raster(7u8, 3, 2).unwrap(), vec![7; 6]);
        assert!(alloc_raster(0u8, 0, 5).unwrap().is_empty());
        assert_eq!(
            alloc_raster(0u32, 65535, 65535),
            Err(DecodeError::RasterTooLarge {
                width: 65535,
                height: 65535
            })
        );
        assert!(alloc_raster(0u8, usize::MAX, 2).is_err());
        assert!(alloc_raster(0u8, 4096, 4097).is_err());
    }
}
