//! Subtitle segment types and dispatch.

use std::sync::Arc;

use super::{
    ClutDefinition,
    DecodeResult,
    Describe,
    DisplayDefinition,
    ObjectData,
    PageComposition,
    RegionComposition,
    TreeNode,
};
use crate::utils::BigEndianReader;

/// Byte that starts every segment.
pub const SYNC_BYTE: u8 = 0x0F;
/// Byte that ends the segment loop of a PES payload.
pub const END_OF_PES_DATA_FIELD_MARKER: u8 = 0xFF;
/// Segment type closing a display set. Not interpreted, kept as opaque.
pub const END_OF_DISPLAY_SET_SEGMENT: u8 = 0x80;
/// Size of the segment header: sync, type, page id, length.
pub const SEGMENT_HEADER_LEN: usize = 6;

/// Segment type identifiers with a dedicated parser.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentType {
    /// Page Composition Segment (0x10)
    PageComposition = 0x10,
    /// Region Composition Segment (0x11)
    RegionComposition = 0x11,
    /// CLUT Definition Segment (0x12)
    ClutDefinition = 0x12,
    /// Object Data Segment (0x13)
    ObjectData = 0x13,
    /// Display Definition Segment (0x14)
    DisplayDefinition = 0x14,
}

impl TryFrom<u8> for SegmentType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(SegmentType::PageComposition),
            0x11 => Ok(SegmentType::RegionComposition),
            0x12 => Ok(SegmentType::ClutDefinition),
            0x13 => Ok(SegmentType::ObjectData),
            0x14 => Ok(SegmentType::DisplayDefinition),
            _ => Err(value),
        }
    }
}

/// Human-readable name of a segment type, including the uninterpreted ones.
pub fn segment_type_name(segment_type: u8) -> &'static str {
    match segment_type {
        0x10 => "page composition segment",
        0x11 => "region composition segment",
        0x12 => "CLUT definition segment",
        0x13 => "object data segment",
        0x14 => "display definition segment",
        0x15 => "disparity signalling segment",
        0x16 => "alternative CLUT segment",
        0x80 => "end of display set segment",
        0xFF => "stuffing",
        _ => "reserved",
    }
}

/// Parsed segment body.
///
/// Region, CLUT and object bodies are shared with the epoch state that
/// accumulates them.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentBody {
    PageComposition(PageComposition),
    RegionComposition(Arc<RegionComposition>),
    ClutDefinition(Arc<ClutDefinition>),
    ObjectData(Arc<ObjectData>),
    DisplayDefinition(DisplayDefinition),
    /// Unknown or future segment type, payload kept uninterpreted
    Opaque,
}

/// One segment of a subtitle PES payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub segment_type: u8,
    pub page_id: u16,
    /// Raw segment payload, `segment_length` bytes
    pub payload: Vec<u8>,
    pub body: SegmentBody,
}

impl Segment {
    /// Parse a segment body from its header fields and payload.
    pub fn parse(segment_type: u8, page_id: u16, payload: &[u8]) -> DecodeResult<Self> {
        let mut reader = BigEndianReader::new(payload);

        let body = match SegmentType::try_from(segment_type) {
            Ok(SegmentType::PageComposition) => {
                SegmentBody::PageComposition(PageComposition::parse(&mut reader)?)
            }
            Ok(SegmentType::RegionComposition) => {
                SegmentBody::RegionComposition(Arc::new(RegionComposition::parse(&mut reader)?))
            }
            Ok(SegmentType::ClutDefinition) => {
                SegmentBody::ClutDefinition(Arc::new(ClutDefinition::parse(&mut reader)?))
            }
            Ok(SegmentType::ObjectData) => {
                SegmentBody::ObjectData(Arc::new(ObjectData::parse(&mut reader)?))
            }
            Ok(SegmentType::DisplayDefinition) => SegmentBody::DisplayDefinition(
                DisplayDefinition::parse(&mut reader, payload.len())?,
            ),
            Err(_) => SegmentBody::Opaque,
        };

        Ok(Self {
            segment_type,
            page_id,
            payload: payload.to_vec(),
            body,
        })
    }

    #[inline]
    pub fn segment_length(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        matches!(self.body, SegmentBody::Opaque)
    }

    /// Whether this segment closes its display set.
    #[inline]
    pub fn is_end_of_display_set(&self) -> bool {
        self.segment_type == END_OF_DISPLAY_SET_SEGMENT
    }
}

impl Describe for Segment {
    fn describe(&self) -> TreeNode {
        let mut fields = vec![
            TreeNode::scalar("sync_byte", format!("0x{:02x}", SYNC_BYTE)),
            TreeNode::scalar(
                "segment_type",
                format!("0x{:02x} ({})", self.segment_type, segment_type_name(self.segment_type)),
            ),
            TreeNode::scalar("page_id", self.page_id),
            TreeNode::scalar("segment_length", self.segment_length()),
        ];

        let body = match &self.body {
            SegmentBody::PageComposition(page) => page.describe(),
            SegmentBody::RegionComposition(region) => region.describe(),
            SegmentBody::ClutDefinition(clut) => clut.describe(),
            SegmentBody::ObjectData(object) => object.describe(),
            SegmentBody::DisplayDefinition(display) => display.describe(),
            SegmentBody::Opaque => {
                let hex: Vec<String> = self.payload.iter().map(|b| format!("{:02x}", b)).collect();
                TreeNode::scalar("data", hex.join(" "))
            }
        };
        fields.push(body);

        TreeNode::branch(segment_type_name(self.segment_type), fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_type_round_trip() {
        for value in 0x10..=0x14u8 {
            let ty = SegmentType::try_from(value).unwrap();
            assert_eq!(ty as u8, value);
        }
        assert_eq!(SegmentType::try_from(0x80), Err(0x80));
    }

    #[test]
    fn test_unknown_type_is_opaque() {
        let segment = Segment::parse(0x15, 1, &[0xDE, 0xAD]).unwrap();
        assert!(segment.is_opaque());
        assert_eq!(segment.payload, vec![0xDE, 0xAD]);
        assert_eq!(segment.segment_length(), 2);

        let tree = segment.describe();
        assert_eq!(tree.label, "disparity signalling segment");
        assert_eq!(tree.child("data").and_then(|n| n.as_scalar()), Some("de ad"));
    }

    #[test]
    fn test_end_of_display_set_is_opaque() {
        let segment = Segment::parse(END_OF_DISPLAY_SET_SEGMENT, 1, &[]).unwrap();
        assert!(segment.is_opaque());
        assert!(segment.is_end_of_display_set());
    }

    #[test]
    fn test_truncated_body_fails() {
        // Page composition needs at least two bytes
        assert!(Segment::parse(0x10, 1, &[0x00]).is_err());
    }

    #[test]
    fn test_describe_page_composition() {
        let segment = Segment::parse(0x10, 3, &[0x0A, 0x04, 0x01, 0x00, 0x00, 0x08, 0x00, 0x10]).unwrap();
        let tree = segment.describe();
        assert_eq!(tree.child("page_id").and_then(|n| n.as_scalar()), Some("3"));
        let page = tree.child("page_composition_segment").unwrap();
        assert_eq!(page.child("page_state").and_then(|n| n.as_scalar()), Some("acquisition point"));
        assert_eq!(page.child("regions").unwrap().children().len(), 1);
    }
}
