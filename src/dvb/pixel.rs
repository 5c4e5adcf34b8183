//! Pixel-data sub-block decoding.
//!
//! Object fields are coded as a sequence of sub-blocks, each introduced by a
//! `data_type` byte:
//! - 0x10 / 0x11 / 0x12 = 2-bit / 4-bit / 8-bit pixel-code string
//! - 0x20 / 0x21 / 0x22 = 2-to-4 / 2-to-8 / 4-to-8 bit map table
//! - 0xF0 = end of object line
//!
//! Each pixel-code string is a run-length grammar of its own. Strings end on an
//! explicit end-of-string code (or when the data runs out) and are followed by
//! stuffing bits up to the next byte boundary.

use super::{BitReader, DecodeError, DecodeResult};

pub const DATA_TYPE_2BIT_STRING: u8 = 0x10;
pub const DATA_TYPE_4BIT_STRING: u8 = 0x11;
pub const DATA_TYPE_8BIT_STRING: u8 = 0x12;
pub const DATA_TYPE_MAP_2_TO_4: u8 = 0x20;
pub const DATA_TYPE_MAP_2_TO_8: u8 = 0x21;
pub const DATA_TYPE_MAP_4_TO_8: u8 = 0x22;
pub const DATA_TYPE_END_OF_LINE: u8 = 0xF0;

/// Map table used when no 2-to-4 table was signalled.
pub const DEFAULT_MAP_2_TO_4: [u8; 4] = [0x0, 0x7, 0x8, 0xF];
/// Map table used when no 2-to-8 table was signalled.
pub const DEFAULT_MAP_2_TO_8: [u8; 4] = [0x00, 0x77, 0x88, 0xFF];
/// Map table used when no 4-to-8 table was signalled.
pub const DEFAULT_MAP_4_TO_8: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
    0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
];

/// Pixel depth of a region, CLUT table or pixel-code string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelDepth {
    TwoBit,
    FourBit,
    EightBit,
}

impl PixelDepth {
    /// Decode the 3-bit `region_depth` field (1 = 2-bit, 2 = 4-bit, 3 = 8-bit).
    pub fn from_region_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PixelDepth::TwoBit),
            2 => Some(PixelDepth::FourBit),
            3 => Some(PixelDepth::EightBit),
            _ => None,
        }
    }

    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            PixelDepth::TwoBit => 2,
            PixelDepth::FourBit => 4,
            PixelDepth::EightBit => 8,
        }
    }

    /// Number of entries in a CLUT table of this depth.
    #[inline]
    pub fn entries(self) -> usize {
        1 << self.bits()
    }
}

/// One decoded pixel-data sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelSubBlock {
    /// Expanded pixel codes of one pixel-code string
    CodeString { depth: PixelDepth, pixels: Vec<u8> },
    MapTable2To4([u8; 4]),
    MapTable2To8([u8; 4]),
    MapTable4To8([u8; 16]),
    EndOfLine,
}

#[inline]
fn emit(out: &mut Vec<u8>, code: u8, count: usize) {
    out.resize(out.len() + count, code);
}

/// Decode a 2-bit/pixel code string, appending pixel codes to `out`.
pub fn read_2bit_string(reader: &mut BitReader, out: &mut Vec<u8>) -> DecodeResult<()> {
    loop {
        if reader.remaining_bits() < 2 {
            break;
        }

        // Most common case: a single non-zero pixel
        let code = reader.read_bits(2)? as u8;
        if code != 0 {
            emit(out, code, 1);
            continue;
        }

        if reader.read_bit()? {
            // switch_1 = 1: 3-bit run, 3..=10 pixels
            let run = reader.read_bits(3)? as usize + 3;
            let code = reader.read_bits(2)? as u8;
            emit(out, code, run);
            continue;
        }

        if reader.read_bit()? {
            // switch_2 = 1: one pixel of code 0
            emit(out, 0, 1);
            continue;
        }

        match reader.read_bits(2)? {
            0b00 => break,
            0b01 => emit(out, 0, 2),
            0b10 => {
                let run = reader.read_bits(4)? as usize + 12;
                let code = reader.read_bits(2)? as u8;
                emit(out, code, run);
            }
            _ => {
                let run = reader.read_bits(8)? as usize + 29;
                let code = reader.read_bits(2)? as u8;
                emit(out, code, run);
            }
        }
    }

    reader.align_to_byte();
    Ok(())
}

/// Decode a 4-bit/pixel code string, appending pixel codes to `out`.
pub fn read_4bit_string(reader: &mut BitReader, out: &mut Vec<u8>) -> DecodeResult<()> {
    loop {
        if reader.remaining_bits() < 4 {
            break;
        }

        let code = reader.read_bits(4)? as u8;
        if code != 0 {
            emit(out, code, 1);
            continue;
        }

        if !reader.read_bit()? {
            // switch_1 = 0: run of code 0, or end of string
            let run = reader.read_bits(3)? as usize;
            if run == 0 {
                break;
            }
            emit(out, 0, run + 2);
            continue;
        }

        if !reader.read_bit()? {
            // switch_2 = 0: 2-bit run, 4..=7 pixels
            let run = reader.read_bits(2)? as usize + 4;
            let code = reader.read_bits(4)? as u8;
            emit(out, code, run);
            continue;
        }

        match reader.read_bits(2)? {
            0b00 => emit(out, 0, 1),
            0b01 => emit(out, 0, 2),
            0b10 => {
                let run = reader.read_bits(4)? as usize + 9;
                let code = reader.read_bits(4)? as u8;
                emit(out, code, run);
            }
            _ => {
                let run = reader.read_bits(8)? as usize + 25;
                let code = reader.read_bits(4)? as u8;
                emit(out, code, run);
            }
        }
    }

    reader.align_to_byte();
    Ok(())
}

/// Decode an 8-bit/pixel code string, appending pixel codes to `out`.
///
/// The coloured run takes its 7-bit length as is, with no additive offset, so
/// a zero length emits nothing.
pub fn read_8bit_string(reader: &mut BitReader, out: &mut Vec<u8>) -> DecodeResult<()> {
    loop {
        if reader.remaining_bits() < 8 {
            break;
        }

        let code = reader.read_bits(8)? as u8;
        if code != 0 {
            emit(out, code, 1);
            continue;
        }

        if !reader.read_bit()? {
            let run = reader.read_bits(7)? as usize;
            if run == 0 {
                break;
            }
            emit(out, 0, run);
        } else {
            let run = reader.read_bits(7)? as usize;
            let code = reader.read_bits(8)? as u8;
            emit(out, code, run);
        }
    }

    reader.align_to_byte();
    Ok(())
}

fn read_map_table<const N: usize>(reader: &mut BitReader, width: u32) -> DecodeResult<[u8; N]> {
    let mut table = [0u8; N];
    for entry in table.iter_mut() {
        *entry = reader.read_bits(width)? as u8;
    }
    Ok(table)
}

/// Read one sub-block starting at its `data_type` byte.
pub fn read_sub_block(reader: &mut BitReader) -> DecodeResult<PixelSubBlock> {
    let data_type = reader.read_bits(8)? as u8;

    let block = match data_type {
        DATA_TYPE_2BIT_STRING | DATA_TYPE_4BIT_STRING | DATA_TYPE_8BIT_STRING => {
            let mut pixels = Vec::new();
            let depth = match data_type {
                DATA_TYPE_2BIT_STRING => {
                    read_2bit_string(reader, &mut pixels)?;
                    PixelDepth::TwoBit
                }
                DATA_TYPE_4BIT_STRING => {
                    read_4bit_string(reader, &mut pixels)?;
                    PixelDepth::FourBit
                }
                _ => {
                    read_8bit_string(reader, &mut pixels)?;
                    PixelDepth::EightBit
                }
            };
            PixelSubBlock::CodeString { depth, pixels }
        }
        DATA_TYPE_MAP_2_TO_4 => PixelSubBlock::MapTable2To4(read_map_table(reader, 4)?),
        DATA_TYPE_MAP_2_TO_8 => PixelSubBlock::MapTable2To8(read_map_table(reader, 8)?),
        DATA_TYPE_MAP_4_TO_8 => PixelSubBlock::MapTable4To8(read_map_table(reader, 8)?),
        DATA_TYPE_END_OF_LINE => PixelSubBlock::EndOfLine,
        other => return Err(DecodeError::UnknownDataType(other)),
    };

    Ok(block)
}

/// Read every sub-block of one field.
pub fn read_sub_blocks(data: &[u8]) -> DecodeResult<Vec<PixelSubBlock>> {
    let mut reader = BitReader::new(data);
    let mut blocks = Vec::new();

    while !reader.is_exhausted() {
        blocks.push(read_sub_block(&mut reader)?);
    }

    Ok(blocks)
}
