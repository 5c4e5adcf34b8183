//! CLUT Definition Segment parsing and default palettes.

use super::{DecodeResult, Describe, PixelDepth, TreeNode};
use crate::utils::{rgb_to_rgba, ycbcr_to_rgba, BigEndianReader};

const TRANSPARENT: u32 = 0;

/// Default 2-bit CLUT: transparent, white, black, 50% grey.
pub static DEFAULT_CLUT_2BIT: [u32; 4] = [
    TRANSPARENT,
    rgb_to_rgba(255, 255, 255, 255),
    rgb_to_rgba(0, 0, 0, 255),
    rgb_to_rgba(127, 127, 127, 255),
];

/// Default 4-bit CLUT.
pub static DEFAULT_CLUT_4BIT: [u32; 16] = default_clut_4bit();

/// Default 8-bit CLUT.
pub static DEFAULT_CLUT_8BIT: [u32; 256] = default_clut_8bit();

const fn bit(i: usize, mask: usize, value: u8) -> u8 {
    if i & mask != 0 { value } else { 0 }
}

const fn default_clut_4bit() -> [u32; 16] {
    let mut table = [TRANSPARENT; 16];
    let mut i = 1;
    while i < 16 {
        let level = if i < 8 { 255 } else { 127 };
        table[i] = rgb_to_rgba(bit(i, 1, level), bit(i, 2, level), bit(i, 4, level), 255);
        i += 1;
    }
    table
}

const fn default_clut_8bit() -> [u32; 256] {
    let mut table = [TRANSPARENT; 256];
    let mut i = 1;
    while i < 256 {
        table[i] = if i < 8 {
            rgb_to_rgba(bit(i, 1, 255), bit(i, 2, 255), bit(i, 4, 255), 63)
        } else {
            match i & 0x88 {
                0x00 => rgb_to_rgba(
                    bit(i, 0x01, 85) + bit(i, 0x10, 170),
                    bit(i, 0x02, 85) + bit(i, 0x20, 170),
                    bit(i, 0x04, 85) + bit(i, 0x40, 170),
                    255,
                ),
                0x08 => rgb_to_rgba(
                    bit(i, 0x01, 85) + bit(i, 0x10, 170),
                    bit(i, 0x02, 85) + bit(i, 0x20, 170),
                    bit(i, 0x04, 85) + bit(i, 0x40, 170),
                    127,
                ),
                0x80 => rgb_to_rgba(
                    127 + bit(i, 0x01, 43) + bit(i, 0x10, 85),
                    127 + bit(i, 0x02, 43) + bit(i, 0x20, 85),
                    127 + bit(i, 0x04, 43) + bit(i, 0x40, 85),
                    255,
                ),
                _ => rgb_to_rgba(
                    bit(i, 0x01, 43) + bit(i, 0x10, 85),
                    bit(i, 0x02, 43) + bit(i, 0x20, 85),
                    bit(i, 0x04, 43) + bit(i, 0x40, 85),
                    255,
                ),
            }
        };
        i += 1;
    }
    table
}

/// Default palette for a depth, used where a CLUT does not override an entry.
pub fn default_palette(depth: PixelDepth) -> &'static [u32] {
    match depth {
        PixelDepth::TwoBit => &DEFAULT_CLUT_2BIT,
        PixelDepth::FourBit => &DEFAULT_CLUT_4BIT,
        PixelDepth::EightBit => &DEFAULT_CLUT_8BIT,
    }
}

/// One signalled CLUT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClutEntry {
    pub entry_id: u8,
    pub two_bit: bool,
    pub four_bit: bool,
    pub eight_bit: bool,
    pub full_range: bool,
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
    /// Transparency, 0 = opaque
    pub t: u8,
}

impl ClutEntry {
    /// Resolved RGBA color. A luma of zero means full transparency.
    pub fn rgba(&self) -> u32 {
        if self.y == 0 {
            return TRANSPARENT;
        }
        ycbcr_to_rgba(self.y, self.cb, self.cr, 255 - self.t)
    }

    fn applies_to(&self, depth: PixelDepth) -> bool {
        match depth {
            PixelDepth::TwoBit => self.two_bit,
            PixelDepth::FourBit => self.four_bit,
            PixelDepth::EightBit => self.eight_bit,
        }
    }
}

/// CLUT Definition Segment with its three resolved tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClutDefinition {
    pub clut_id: u8,
    pub version: u8,
    pub entries: Vec<ClutEntry>,
    table_2bit: [u32; 4],
    table_4bit: [u32; 16],
    table_8bit: Box<[u32; 256]>,
}

impl ClutDefinition {
    pub fn parse(reader: &mut BigEndianReader) -> DecodeResult<Self> {
        let clut_id = reader.read_u8()?;
        let version = reader.read_u8()? >> 4;

        let mut entries = Vec::new();
        while reader.remaining() >= 2 {
            let entry_id = reader.read_u8()?;
            let flags = reader.read_u8()?;
            let full_range = (flags & 0x01) != 0;

            let (y, cr, cb, t) = if full_range {
                (
                    reader.read_u8()?,
                    reader.read_u8()?,
                    reader.read_u8()?,
                    reader.read_u8()?,
                )
            } else {
                // Reduced range: Y 6 bits, Cr 4 bits, Cb 4 bits, T 2 bits
                let word = reader.read_u16()?;
                (
                    ((word >> 10) as u8) << 2,
                    (((word >> 6) & 0x0F) as u8) << 4,
                    (((word >> 2) & 0x0F) as u8) << 4,
                    ((word & 0x03) as u8) << 6,
                )
            };

            entries.push(ClutEntry {
                entry_id,
                two_bit: (flags & 0x80) != 0,
                four_bit: (flags & 0x40) != 0,
                eight_bit: (flags & 0x20) != 0,
                full_range,
                y,
                cr,
                cb,
                t,
            });
        }

        Ok(Self::from_entries(clut_id, version, entries))
    }

    /// Build a CLUT from default tables with `entries` applied on top.
    pub fn from_entries(clut_id: u8, version: u8, entries: Vec<ClutEntry>) -> Self {
        let mut table_2bit = DEFAULT_CLUT_2BIT;
        let mut table_4bit = DEFAULT_CLUT_4BIT;
        let mut table_8bit = Box::new(DEFAULT_CLUT_8BIT);

        for entry in &entries {
            let rgba = entry.rgba();
            let id = entry.entry_id as usize;
            if entry.applies_to(PixelDepth::TwoBit) && id < table_2bit.len() {
                table_2bit[id] = rgba;
            }
            if entry.applies_to(PixelDepth::FourBit) && id < table_4bit.len() {
                table_4bit[id] = rgba;
            }
            if entry.applies_to(PixelDepth::EightBit) {
                table_8bit[id] = rgba;
            }
        }

        Self {
            clut_id,
            version,
            entries,
            table_2bit,
            table_4bit,
            table_8bit,
        }
    }

    /// RGBA table for a depth.
    pub fn palette(&self, depth: PixelDepth) -> &[u32] {
        match depth {
            PixelDepth::TwoBit => &self.table_2bit,
            PixelDepth::FourBit => &self.table_4bit,
            PixelDepth::EightBit => &self.table_8bit[..],
        }
    }

    #[inline]
    pub fn color(&self, depth: PixelDepth, index: u8) -> u32 {
        self.palette(depth).get(index as usize).copied().unwrap_or(TRANSPARENT)
    }
}

/// Apply a palette to indexed pixel data, producing RGBA output.
#[inline]
pub fn apply_palette(indexed: &[u8], palette: &[u32], target: &mut [u32]) {
    let len = indexed.len().min(target.len());
    let palette_len = palette.len();

    for i in 0..len {
        let idx = indexed[i] as usize;
        target[i] = if idx < palette_len { palette[idx] } else { TRANSPARENT };
    }
}

impl Describe for ClutDefinition {
    fn describe(&self) -> TreeNode {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                let mut depths = Vec::new();
                if e.two_bit {
                    depths.push("2-bit");
                }
                if e.four_bit {
                    depths.push("4-bit");
                }
                if e.eight_bit {
                    depths.push("8-bit");
                }
                TreeNode::branch(
                    format!("entry {}", e.entry_id),
                    vec![
                        TreeNode::scalar("tables", depths.join(", ")),
                        TreeNode::scalar("full_range_flag", e.full_range),
                        TreeNode::scalar("Y", e.y),
                        TreeNode::scalar("Cr", e.cr),
                        TreeNode::scalar("Cb", e.cb),
                        TreeNode::scalar("T", e.t),
                        TreeNode::scalar("RGBA", format!("#{:08x}", e.rgba().swap_bytes())),
                    ],
                )
            })
            .collect();

        TreeNode::branch(
            "CLUT_definition_segment",
            vec![
                TreeNode::scalar("CLUT_id", self.clut_id),
                TreeNode::scalar("CLUT_version_number", self.version),
                TreeNode::branch("entries", entries),
            ],
        )
    }
}
