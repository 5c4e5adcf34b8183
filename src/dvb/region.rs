//! Region Composition Segment parsing.

use super::{DecodeError, DecodeResult, Describe, PixelDepth, TreeNode};
use crate::utils::BigEndianReader;

/// Kind of object placed in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Basic object, bitmap
    Bitmap,
    /// Basic object, character
    Character,
    /// Composite object, string of characters
    CompositeString,
    Reserved,
}

impl ObjectType {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ObjectType::Bitmap,
            1 => ObjectType::Character,
            2 => ObjectType::CompositeString,
            _ => ObjectType::Reserved,
        }
    }

    /// Character objects carry foreground and background pixel codes.
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, ObjectType::Character | ObjectType::CompositeString)
    }
}

/// Object reference within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionObject {
    pub object_id: u16,
    pub object_type: ObjectType,
    /// 0 = carried in the stream, 1 = stored in the decoder ROM
    pub provider_flag: u8,
    /// Horizontal position relative to the region's left edge
    pub h_offset: u16,
    /// Vertical position relative to the region's top edge
    pub v_offset: u16,
    pub foreground_index: Option<u8>,
    pub background_index: Option<u8>,
}

/// Region Composition Segment defines a region and the objects placed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionComposition {
    pub region_id: u8,
    pub version: u8,
    /// Fill the region with the pixel code of its depth before drawing objects
    pub fill: bool,
    pub width: u16,
    pub height: u16,
    pub level_of_compatibility: u8,
    pub depth: PixelDepth,
    pub clut_id: u8,
    pub pixel_code_8bit: u8,
    pub pixel_code_4bit: u8,
    pub pixel_code_2bit: u8,
    pub objects: Vec<RegionObject>,
}

impl RegionComposition {
    pub fn parse(reader: &mut BigEndianReader) -> DecodeResult<Self> {
        let region_id = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let version = flags >> 4;
        let fill = (flags & 0x08) != 0;
        let width = reader.read_u16()?;
        let height = reader.read_u16()?;

        let levels = reader.read_u8()?;
        let level_of_compatibility = levels >> 5;
        let depth_code = (levels >> 2) & 0x07;
        let depth = PixelDepth::from_region_code(depth_code).ok_or(
            DecodeError::InvalidRegionDepth {
                region_id,
                code: depth_code,
            },
        )?;

        let clut_id = reader.read_u8()?;
        let pixel_code_8bit = reader.read_u8()?;
        let codes = reader.read_u8()?;
        let pixel_code_4bit = codes >> 4;
        let pixel_code_2bit = (codes >> 2) & 0x03;

        let mut objects = Vec::new();
        while reader.remaining() >= 6 {
            let object_id = reader.read_u16()?;
            let word = reader.read_u16()?;
            let object_type = ObjectType::from_bits((word >> 14) as u8);
            let provider_flag = ((word >> 12) & 0x03) as u8;
            let h_offset = word & 0x0FFF;
            let v_offset = reader.read_u16()? & 0x0FFF;

            let (foreground_index, background_index) = if object_type.is_text() {
                (Some(reader.read_u8()?), Some(reader.read_u8()?))
            } else {
                (None, None)
            };

            objects.push(RegionObject {
                object_id,
                object_type,
                provider_flag,
                h_offset,
                v_offset,
                foreground_index,
                background_index,
            });
        }

        Ok(Self {
            region_id,
            version,
            fill,
            width,
            height,
            level_of_compatibility,
            depth,
            clut_id,
            pixel_code_8bit,
            pixel_code_4bit,
            pixel_code_2bit,
            objects,
        })
    }

    /// Pixel code the region is filled with, if the fill flag is set.
    pub fn fill_index(&self) -> Option<u8> {
        if !self.fill {
            return None;
        }
        Some(match self.depth {
            PixelDepth::TwoBit => self.pixel_code_2bit,
            PixelDepth::FourBit => self.pixel_code_4bit,
            PixelDepth::EightBit => self.pixel_code_8bit,
        })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Describe for RegionComposition {
    fn describe(&self) -> TreeNode {
        let objects = self
            .objects
            .iter()
            .map(|o| {
                let mut fields = vec![
                    TreeNode::scalar("object_type", format!("{:?}", o.object_type)),
                    TreeNode::scalar("object_provider_flag", o.provider_flag),
                    TreeNode::scalar("object_horizontal_position", o.h_offset),
                    TreeNode::scalar("object_vertical_position", o.v_offset),
                ];
                if let (Some(fg), Some(bg)) = (o.foreground_index, o.background_index) {
                    fields.push(TreeNode::scalar("foreground_pixel_code", fg));
                    fields.push(TreeNode::scalar("background_pixel_code", bg));
                }
                TreeNode::branch(format!("object {}", o.object_id), fields)
            })
            .collect();

        TreeNode::branch(
            "region_composition_segment",
            vec![
                TreeNode::scalar("region_id", self.region_id),
                TreeNode::scalar("region_version_number", self.version),
                TreeNode::scalar("region_fill_flag", self.fill),
                TreeNode::scalar("region_width", self.width),
                TreeNode::scalar("region_height", self.height),
                TreeNode::scalar("region_level_of_compatibility", self.level_of_compatibility),
                TreeNode::scalar("region_depth", format!("{}-bit", self.depth.bits())),
                TreeNode::scalar("CLUT_id", self.clut_id),
                TreeNode::scalar("region_8-bit_pixel_code", self.pixel_code_8bit),
                TreeNode::scalar("region_4-bit_pixel_code", self.pixel_code_4bit),
                TreeNode::scalar("region_2-bit_pixel_code", self.pixel_code_2bit),
                TreeNode::branch("objects", objects),
            ],
        )
    }
}
