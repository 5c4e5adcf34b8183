//! PES payload scanning.
//!
//! A subtitle PES payload is laid out as:
//! - data_identifier (0x20)
//! - subtitle_stream_id (0x00)
//! - zero or more segments: 0x0F, type, page_id (16), length (16), payload
//! - end_of_PES_data_field_marker (0xFF)

use log::{debug, trace, warn};

use crate::utils::BigEndianReader;

use super::{
    segment_type_name,
    DecodeError,
    DecodeResult,
    Describe,
    Segment,
    TreeNode,
    END_OF_PES_DATA_FIELD_MARKER,
    SEGMENT_HEADER_LEN,
    SYNC_BYTE,
};

/// Expected `data_identifier` of a DVB subtitle PES payload.
pub const DVB_SUBTITLE_DATA_IDENTIFIER: u8 = 0x20;

/// A segment that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentError {
    /// Offset of the segment's sync byte within the payload
    pub offset: usize,
    pub segment_type: u8,
    /// Page of the segment, unknown when its header is cut short
    pub page_id: Option<u16>,
    pub error: DecodeError,
}

/// Result of scanning one PES payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PesPacket {
    pub data_identifier: u8,
    pub subtitle_stream_id: u8,
    /// Successfully parsed segments in arrival order
    pub segments: Vec<Segment>,
    /// Segments dropped while scanning
    pub errors: Vec<SegmentError>,
}

/// Scan a PES payload into segments.
///
/// Fails only when the two header bytes are missing. A segment that does not
/// parse is dropped and recorded in [`PesPacket::errors`]; scanning continues
/// with the next segment.
pub fn scan_payload(data: &[u8]) -> DecodeResult<PesPacket> {
    let mut reader = BigEndianReader::new(data);
    let data_identifier = reader.read_u8()?;
    let subtitle_stream_id = reader.read_u8()?;
    if data_identifier != DVB_SUBTITLE_DATA_IDENTIFIER {
        debug!("unexpected data_identifier 0x{:02x}", data_identifier);
    }

    let mut packet = PesPacket {
        data_identifier,
        subtitle_stream_id,
        segments: Vec::new(),
        errors: Vec::new(),
    };

    while let Ok(sync) = reader.read_u8() {
        let offset = reader.position() - 1;
        if sync != SYNC_BYTE {
            if sync != END_OF_PES_DATA_FIELD_MARKER {
                debug!("segment loop ended by byte 0x{:02x} at offset {}", sync, offset);
            }
            break;
        }

        if reader.remaining() < SEGMENT_HEADER_LEN - 1 {
            let remaining = (reader.remaining() + 1) * 8;
            let segment_type = reader.read_u8().unwrap_or(0);
            packet.errors.push(SegmentError {
                offset,
                segment_type,
                page_id: reader.read_u16().ok(),
                error: DecodeError::OutOfData {
                    requested: SEGMENT_HEADER_LEN * 8,
                    remaining,
                },
            });
            warn!("truncated segment header at offset {}", offset);
            break;
        }

        let segment_type = reader.read_u8()?;
        let page_id = reader.read_u16()?;
        let segment_length = reader.read_u16()? as usize;

        let body = match reader.read_bytes(segment_length) {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    "{} at offset {} claims {} bytes, only {} left",
                    segment_type_name(segment_type),
                    offset,
                    segment_length,
                    reader.remaining()
                );
                packet.errors.push(SegmentError {
                    offset,
                    segment_type,
                    page_id: Some(page_id),
                    error,
                });
                break;
            }
        };

        trace!(
            "{} (0x{:02x}) page {} length {}",
            segment_type_name(segment_type),
            segment_type,
            page_id,
            segment_length
        );

        match Segment::parse(segment_type, page_id, body) {
            Ok(segment) => packet.segments.push(segment),
            Err(error) => {
                warn!(
                    "dropping {} at offset {}: {}",
                    segment_type_name(segment_type),
                    offset,
                    error
                );
                packet.errors.push(SegmentError {
                    offset,
                    segment_type,
                    page_id: Some(page_id),
                    error,
                });
            }
        }
    }

    Ok(packet)
}

impl Describe for PesPacket {
    fn describe(&self) -> TreeNode {
        let mut children = vec![
            TreeNode::scalar("data_identifier", format!("0x{:02x}", self.data_identifier)),
            TreeNode::scalar("subtitle_stream_id", self.subtitle_stream_id),
        ];
        children.extend(self.segments.iter().map(|s| s.describe()));
        children.extend(self.errors.iter().map(|e| {
            TreeNode::scalar(
                format!("error at offset {}", e.offset),
                format!("{}: {}", segment_type_name(e.segment_type), e.error),
            )
        }));
        TreeNode::branch("subtitling_segments", children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvb::testutil::{pes, segment};
    use crate::dvb::SegmentBody;

    #[test]
    fn test_scan_multiple_segments() {
        let data = pes(&[
            segment(0x14, 1, &[0x02, 0xD0, 0x02, 0x40]),
            segment(0x10, 1, &[0x05, 0x04]),
            segment(0x42, 1, &[0x01, 0x02, 0x03]),
        ]);
        let packet = scan_payload(&data).unwrap();
        assert_eq!(packet.data_identifier, 0x20);
        assert_eq!(packet.subtitle_stream_id, 0x00);
        assert!(packet.errors.is_empty());
        assert_eq!(packet.segments.len(), 3);
        assert!(matches!(packet.segments[0].body, SegmentBody::DisplayDefinition(_)));
        assert!(matches!(packet.segments[1].body, SegmentBody::PageComposition(_)));
        assert_eq!(packet.segments[2].segment_type, 0x42);
        assert!(packet.segments[2].is_opaque());
        assert_eq!(packet.segments[2].payload, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_bad_segment_does_not_stop_scan() {
        let data = pes(&[
            segment(0x10, 1, &[0x05, 0x0C]), // reserved page state
            segment(0x10, 1, &[0x05, 0x00]),
        ]);
        let packet = scan_payload(&data).unwrap();
        assert_eq!(packet.segments.len(), 1);
        assert_eq!(packet.errors.len(), 1);
        assert_eq!(packet.errors[0].offset, 2);
        assert_eq!(packet.errors[0].page_id, Some(1));
        assert_eq!(packet.errors[0].error, DecodeError::ReservedPageState);
    }

    #[test]
    fn test_truncated_segment() {
        let mut data = vec![0x20, 0x00];
        data.extend(segment(0x10, 1, &[0x05, 0x00]));
        data.extend([0x0F, 0x11, 0x00, 0x01, 0x00, 0x20, 0x01]);
        let packet = scan_payload(&data).unwrap();
        assert_eq!(packet.segments.len(), 1);
        assert_eq!(packet.errors.len(), 1);
        assert_eq!(packet.errors[0].segment_type, 0x11);
        assert_eq!(packet.errors[0].page_id, Some(1));
        assert!(matches!(packet.errors[0].error, DecodeError::OutOfData { .. }));
    }

    #[test]
    fn test_truncated_segment_header() {
        let mut data = pes(&[]);
        data.pop();
        data.extend([0x0F, 0x10, 0x00, 0x09, 0x00]);
        let packet = scan_payload(&data).unwrap();
        assert!(packet.segments.is_empty());
        assert_eq!(packet.errors.len(), 1);
        assert_eq!(packet.errors[0].offset, 2);
        assert_eq!(packet.errors[0].segment_type, 0x10);
        assert_eq!(packet.errors[0].page_id, Some(9));
        assert_eq!(
            packet.errors[0].error,
            DecodeError::OutOfData {
                requested: 48,
                remaining: 40
            }
        );

        let packet = scan_payload(&[0x20, 0x00, 0x0F, 0x10]).unwrap();
        assert_eq!(packet.errors[0].page_id, None);
    }

    #[test]
    fn test_stops_at_non_sync_byte() {
        let mut data = pes(&[segment(0x10, 1, &[0x05, 0x00])]);
        // Anything after the end marker is ignored
        data.extend(segment(0x10, 1, &[0x05, 0x00]));
        let packet = scan_payload(&data).unwrap();
        assert_eq!(packet.segments.len(), 1);
        assert!(packet.errors.is_empty());
    }

    #[test]
    fn test_empty_payloads() {
        assert!(scan_payload(&[0x20]).is_err());
        let packet = scan_payload(&[0x20, 0x00]).unwrap();
        assert!(packet.segments.is_empty());
    }

    #[test]
    fn test_describe_packet() {
        let data = pes(&[segment(0x10, 1, &[0x05, 0x00])]);
        let tree = scan_payload(&data).unwrap().describe();
        assert_eq!(tree.label, "subtitling_segments");
        assert_eq!(tree.children().len(), 3);
        assert!(tree.to_string().contains("page_time_out: 5"));
    }
}
