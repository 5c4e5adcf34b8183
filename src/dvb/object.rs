//! Object Data Segment parsing and raster assembly.

use std::sync::OnceLock;

use log::warn;

use super::{
    read_sub_blocks,
    DecodeError,
    DecodeResult,
    Describe,
    PixelDepth,
    PixelSubBlock,
    TreeNode,
    DEFAULT_MAP_2_TO_4,
    DEFAULT_MAP_2_TO_8,
    DEFAULT_MAP_4_TO_8,
};
use crate::utils::BigEndianReader;

/// How the object's content is coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCoding {
    /// Interlaced pixel data, one sub-block sequence per field
    Bitmap {
        top_field: Vec<u8>,
        bottom_field: Vec<u8>,
    },
    /// A string of character codes
    Text { characters: Vec<u16> },
}

/// Object Data Segment.
#[derive(Debug)]
pub struct ObjectData {
    pub object_id: u16,
    pub version: u8,
    /// Pixel code 1 leaves the underlying region pixel untouched
    pub non_modifying_colour: bool,
    pub coding: ObjectCoding,
    raster: OnceLock<Option<ObjectRaster>>,
}

impl Clone for ObjectData {
    fn clone(&self) -> Self {
        Self {
            object_id: self.object_id,
            version: self.version,
            non_modifying_colour: self.non_modifying_colour,
            coding: self.coding.clone(),
            raster: self.raster.clone(),
        }
    }
}

impl PartialEq for ObjectData {
    fn eq(&self, other: &Self) -> bool {
        self.object_id == other.object_id
            && self.version == other.version
            && self.non_modifying_colour == other.non_modifying_colour
            && self.coding == other.coding
    }
}

/// Decoded object bitmap: one pixel code per pixel, in the coding depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRaster {
    pub width: usize,
    pub height: usize,
    pub depth: PixelDepth,
    pub pixels: Vec<u8>,
    pub map_2_to_4: [u8; 4],
    pub map_2_to_8: [u8; 4],
    pub map_4_to_8: [u8; 16],
}

impl ObjectRaster {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Convert a pixel code of this raster to a code of `target` depth.
    ///
    /// Deeper targets go through the map tables, shallower ones keep the most
    /// significant bits.
    pub fn remap(&self, code: u8, target: PixelDepth) -> u8 {
        match (self.depth, target) {
            (PixelDepth::TwoBit, PixelDepth::FourBit) => self.map_2_to_4[(code & 0x03) as usize],
            (PixelDepth::TwoBit, PixelDepth::EightBit) => self.map_2_to_8[(code & 0x03) as usize],
            (PixelDepth::FourBit, PixelDepth::EightBit) => self.map_4_to_8[(code & 0x0F) as usize],
            (from, to) if from.bits() > to.bits() => code >> (from.bits() - to.bits()),
            _ => code,
        }
    }
}

/// Lines of one field, all of one width and depth.
#[derive(Debug, Default)]
struct FieldLines {
    depth: Option<PixelDepth>,
    lines: Vec<Vec<u8>>,
}

impl FieldLines {
    fn width(&self) -> usize {
        self.lines.first().map_or(0, |l| l.len())
    }
}

/// Map tables in effect while assembling one object.
struct MapTables {
    map_2_to_4: [u8; 4],
    map_2_to_8: [u8; 4],
    map_4_to_8: [u8; 16],
}

impl Default for MapTables {
    fn default() -> Self {
        Self {
            map_2_to_4: DEFAULT_MAP_2_TO_4,
            map_2_to_8: DEFAULT_MAP_2_TO_8,
            map_4_to_8: DEFAULT_MAP_4_TO_8,
        }
    }
}

fn mismatch(object_id: u16, detail: String) -> DecodeError {
    DecodeError::DimensionMismatch { object_id, detail }
}

fn assemble_field(
    object_id: u16,
    blocks: Vec<PixelSubBlock>,
    maps: &mut MapTables,
) -> DecodeResult<FieldLines> {
    let mut field = FieldLines::default();
    let mut line = Vec::new();

    for block in blocks {
        match block {
            PixelSubBlock::CodeString { depth, pixels } => {
                match field.depth {
                    Some(current) if current != depth => {
                        return Err(mismatch(
                            object_id,
                            format!("{}-bit and {}-bit code strings mixed", current.bits(), depth.bits()),
                        ));
                    }
                    _ => field.depth = Some(depth),
                }
                line.extend_from_slice(&pixels);
            }
            PixelSubBlock::EndOfLine => field.lines.push(std::mem::take(&mut line)),
            PixelSubBlock::MapTable2To4(table) => maps.map_2_to_4 = table,
            PixelSubBlock::MapTable2To8(table) => maps.map_2_to_8 = table,
            PixelSubBlock::MapTable4To8(table) => maps.map_4_to_8 = table,
        }
    }

    // A trailing line without an end-of-line code still counts
    if !line.is_empty() {
        field.lines.push(line);
    }

    let width = field.width();
    if let Some(row) = field.lines.iter().position(|l| l.len() != width) {
        return Err(mismatch(
            object_id,
            format!("row {} is {} pixels wide, expected {}", row, field.lines[row].len(), width),
        ));
    }

    Ok(field)
}

impl ObjectData {
    pub fn new(object_id: u16, version: u8, non_modifying_colour: bool, coding: ObjectCoding) -> Self {
        Self {
            object_id,
            version,
            non_modifying_colour,
            coding,
            raster: OnceLock::new(),
        }
    }

    pub fn parse(reader: &mut BigEndianReader) -> DecodeResult<Self> {
        let object_id = reader.read_u16()?;
        let flags = reader.read_u8()?;
        let version = flags >> 4;
        let method = (flags >> 2) & 0x03;
        let non_modifying_colour = (flags & 0x02) != 0;

        let coding = match method {
            0 => {
                let top_length = reader.read_u16()? as usize;
                let bottom_length = reader.read_u16()? as usize;
                let top_field = reader.read_bytes(top_length)?.to_vec();
                let bottom_field = reader.read_bytes(bottom_length)?.to_vec();
                ObjectCoding::Bitmap {
                    top_field,
                    bottom_field,
                }
            }
            1 => {
                let count = reader.read_u8()? as usize;
                let mut characters = Vec::with_capacity(count);
                for _ in 0..count {
                    characters.push(reader.read_u16()?);
                }
                ObjectCoding::Text { characters }
            }
            _ => return Err(DecodeError::UnsupportedCodingMethod { object_id, method }),
        };

        Ok(Self::new(object_id, version, non_modifying_colour, coding))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.coding, ObjectCoding::Text { .. })
    }

    /// Character string of a text-coded object.
    pub fn text(&self) -> Option<String> {
        match &self.coding {
            ObjectCoding::Text { characters } => Some(
                characters
                    .iter()
                    .map(|&c| char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            ),
            ObjectCoding::Bitmap { .. } => None,
        }
    }

    /// Decoded raster, built on first use and cached.
    ///
    /// Returns `None` for text objects and for bitmaps that fail to decode.
    pub fn raster(&self) -> Option<&ObjectRaster> {
        self.raster
            .get_or_init(|| {
                if self.is_text() {
                    return None;
                }
                match self.build_raster() {
                    Ok(raster) => Some(raster),
                    Err(err) => {
                        warn!("object {} dropped: {}", self.object_id, err);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Decode both fields and interleave them into one raster.
    pub fn build_raster(&self) -> DecodeResult<ObjectRaster> {
        let (top_field, bottom_field) = match &self.coding {
            ObjectCoding::Bitmap {
                top_field,
                bottom_field,
            } => (top_field, bottom_field),
            ObjectCoding::Text { .. } => {
                return Err(DecodeError::UnsupportedCodingMethod {
                    object_id: self.object_id,
                    method: 1,
                })
            }
        };

        let id = self.object_id;
        let mut maps = MapTables::default();
        let top = assemble_field(id, read_sub_blocks(top_field)?, &mut maps)?;
        let bottom = assemble_field(id, read_sub_blocks(bottom_field)?, &mut maps)?;

        let t = top.lines.len();
        let b = bottom.lines.len();
        if b != t && b + 1 != t {
            return Err(mismatch(id, format!("{} top field rows against {} bottom field rows", t, b)));
        }
        if b > 0 && bottom.width() != top.width() {
            return Err(mismatch(
                id,
                format!("top field is {} pixels wide, bottom field {}", top.width(), bottom.width()),
            ));
        }
        let depth = match (top.depth, bottom.depth) {
            (Some(a), Some(b)) if a != b => {
                return Err(mismatch(id, format!("{}-bit top field with {}-bit bottom field", a.bits(), b.bits())));
            }
            (Some(d), _) | (None, Some(d)) => d,
            (None, None) => PixelDepth::TwoBit,
        };

        let width = top.width();
        let height = t + b;
        let mut pixels = Vec::with_capacity(width * height);
        let mut bottom_lines = bottom.lines.into_iter();
        for line in top.lines {
            pixels.extend_from_slice(&line);
            if let Some(line) = bottom_lines.next() {
                pixels.extend_from_slice(&line);
            }
        }

        Ok(ObjectRaster {
            width,
            height,
            depth,
            pixels,
            map_2_to_4: maps.map_2_to_4,
            map_2_to_8: maps.map_2_to_8,
            map_4_to_8: maps.map_4_to_8,
        })
    }
}

fn describe_field(label: &str, data: &[u8]) -> TreeNode {
    let blocks = match read_sub_blocks(data) {
        Ok(blocks) => blocks,
        Err(err) => return TreeNode::scalar(label, format!("undecodable: {}", err)),
    };

    let children = blocks
        .iter()
        .map(|block| match block {
            PixelSubBlock::CodeString { depth, pixels } => TreeNode::scalar(
                format!("{}-bit/pixel_code_string", depth.bits()),
                format!("{} pixels", pixels.len()),
            ),
            PixelSubBlock::MapTable2To4(t) => TreeNode::scalar("2_to_4-bit_map-table", format!("{:?}", t)),
            PixelSubBlock::MapTable2To8(t) => TreeNode::scalar("2_to_8-bit_map-table", format!("{:?}", t)),
            PixelSubBlock::MapTable4To8(t) => TreeNode::scalar("4_to_8-bit_map-table", format!("{:?}", t)),
            PixelSubBlock::EndOfLine => TreeNode::scalar("end_of_object_line_code", "0xF0"),
        })
        .collect();

    TreeNode::branch(label, children)
}

impl Describe for ObjectData {
    fn describe(&self) -> TreeNode {
        let mut fields = vec![
            TreeNode::scalar("object_id", self.object_id),
            TreeNode::scalar("object_version_number", self.version),
            TreeNode::scalar("non_modifying_colour_flag", self.non_modifying_colour),
        ];

        match &self.coding {
            ObjectCoding::Bitmap {
                top_field,
                bottom_field,
            } => {
                fields.push(TreeNode::scalar("object_coding_method", "coding of pixels"));
                fields.push(TreeNode::scalar("top_field_data_block_length", top_field.len()));
                fields.push(TreeNode::scalar("bottom_field_data_block_length", bottom_field.len()));
                fields.push(describe_field("top field", top_field));
                fields.push(describe_field("bottom field", bottom_field));
                if let Some(raster) = self.raster() {
                    fields.push(TreeNode::scalar(
                        "raster",
                        format!("{}x{} @ {}-bit", raster.width, raster.height, raster.depth.bits()),
                    ));
                }
            }
            ObjectCoding::Text { characters } => {
                fields.push(TreeNode::scalar("object_coding_method", "coded as a string of characters"));
                fields.push(TreeNode::scalar("number_of_codes", characters.len()));
                fields.push(TreeNode::scalar("text", self.text().unwrap_or_default()));
            }
        }

        TreeNode::branch("object_data_segment", fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvb::testutil::{line_4bit, object_segment_payload};

    fn bitmap(top: Vec<u8>, bottom: Vec<u8>) -> ObjectData {
        ObjectData::new(
            1,
            0,
            false,
            ObjectCoding::Bitmap {
                top_field: top,
                bottom_field: bottom,
            },
        )
    }

    fn rows(lines: &[&[u8]]) -> Vec<u8> {
        lines.iter().flat_map(|l| line_4bit(l)).collect()
    }

    #[test]
    fn test_parse_bitmap_object() {
        let top = line_4bit(&[1, 2]);
        let bottom = line_4bit(&[3, 4]);
        let payload = object_segment_payload(0x0102, 5, &top, &bottom);
        let object = ObjectData::parse(&mut BigEndianReader::new(&payload)).unwrap();
        assert_eq!(object.object_id, 0x0102);
        assert_eq!(object.version, 5);
        assert!(!object.non_modifying_colour);
        assert_eq!(
            object.coding,
            ObjectCoding::Bitmap {
                top_field: top,
                bottom_field: bottom,
            }
        );
    }

    #[test]
    fn test_parse_text_object() {
        let payload = [0x00, 0x07, 0x16, 0x02, 0x00, 0x48, 0x00, 0x69];
        let object = ObjectData::parse(&mut BigEndianReader::new(&payload)).unwrap();
        assert_eq!(object.version, 1);
        assert!(object.non_modifying_colour);
        assert!(object.is_text());
        assert_eq!(object.text().as_deref(), Some("Hi"));
        assert!(object.raster().is_none());
    }

    #[test]
    fn test_reserved_coding_method() {
        let payload = [0x00, 0x07, 0x08, 0x00];
        assert_eq!(
            ObjectData::parse(&mut BigEndianReader::new(&payload)).unwrap_err(),
            DecodeError::UnsupportedCodingMethod { object_id: 7, method: 2 }
        );
    }

    #[test]
    fn test_interleave_equal_fields() {
        let object = bitmap(rows(&[&[1, 1], &[3, 3]]), rows(&[&[2, 2], &[4, 4]]));
        let raster = object.build_raster().unwrap();
        assert_eq!((raster.width, raster.height), (2, 4));
        assert_eq!(raster.depth, PixelDepth::FourBit);
        assert_eq!(raster.pixels, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_interleave_odd_height() {
        let object = bitmap(rows(&[&[1], &[3], &[5]]), rows(&[&[2], &[4]]));
        let raster = object.build_raster().unwrap();
        assert_eq!(raster.height, 5);
        assert_eq!(raster.pixels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_single_row_with_empty_bottom_field() {
        let object = bitmap(rows(&[&[7, 7, 7]]), Vec::new());
        let raster = object.build_raster().unwrap();
        assert_eq!((raster.width, raster.height), (3, 1));
    }

    #[test]
    fn test_row_count_mismatch_yields_no_raster() {
        for (t, b) in [(3usize, 1usize), (1, 2), (0, 1), (4, 0)] {
            let top_row: &[u8] = &[1, 1];
            let bottom_row: &[u8] = &[2, 2];
            let top = vec![top_row; t];
            let bottom = vec![bottom_row; b];
            let object = bitmap(rows(&top), rows(&bottom));
            assert!(
                matches!(object.build_raster(), Err(DecodeError::DimensionMismatch { .. })),
                "t={} b={}",
                t,
                b
            );
            assert!(object.raster().is_none());
        }
    }

    #[test]
    fn test_row_width_mismatch() {
        let object = bitmap(rows(&[&[1, 1], &[1, 1, 1, 1]]), rows(&[&[2, 2], &[2, 2]]));
        assert!(matches!(object.build_raster(), Err(DecodeError::DimensionMismatch { .. })));

        let object = bitmap(rows(&[&[1, 1]]), rows(&[&[2, 2, 2, 2]]));
        assert!(matches!(object.build_raster(), Err(DecodeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_depth_mismatch() {
        // 2-bit line "1 1" then a 4-bit line "1 1"
        let mut top = vec![0x10, 0b0101_0000, 0x00, 0xF0];
        top.extend(line_4bit(&[1, 1]));
        let object = bitmap(top, Vec::new());
        assert!(matches!(object.build_raster(), Err(DecodeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_map_tables_carried_to_raster() {
        let mut top = vec![0x20, 0x12, 0x34];
        top.extend(line_4bit(&[1]));
        let raster = bitmap(top, Vec::new()).build_raster().unwrap();
        assert_eq!(raster.map_2_to_4, [1, 2, 3, 4]);
        assert_eq!(raster.map_4_to_8, DEFAULT_MAP_4_TO_8);
        assert_eq!(raster.remap(5, PixelDepth::EightBit), 0x55);
        assert_eq!(raster.remap(0xC, PixelDepth::TwoBit), 3);
        assert_eq!(raster.remap(0xC, PixelDepth::FourBit), 0xC);
    }

    #[test]
    fn test_raster_is_cached() {
        let object = bitmap(rows(&[&[1, 2]]), Vec::new());
        let first = object.raster().unwrap() as *const ObjectRaster;
        let second = object.raster().unwrap() as *const ObjectRaster;
        assert_eq!(first, second);
    }
}
