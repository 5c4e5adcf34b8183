//! Builders for subtitle test data.

use super::{DisplaySet, Segment, DATA_TYPE_4BIT_STRING, DATA_TYPE_END_OF_LINE};

/// Pack a string of '0' and '1' characters MSB-first, ignoring whitespace and
/// zero-padding the last byte.
pub fn bits(pattern: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut count = 0;
    for c in pattern.chars().filter(|c| !c.is_whitespace()) {
        if count % 8 == 0 {
            out.push(0);
        }
        if c == '1' {
            let last = out.len() - 1;
            out[last] |= 0x80 >> (count % 8);
        }
        count += 1;
    }
    out
}

/// One object line as a 4-bit code string of literal non-zero codes,
/// followed by an end-of-line code.
pub fn line_4bit(codes: &[u8]) -> Vec<u8> {
    let mut nibbles: Vec<u8> = codes.to_vec();
    // End of string: 0000 0 000
    nibbles.extend([0, 0]);
    if nibbles.len() % 2 == 1 {
        nibbles.push(0);
    }

    let mut out = vec![DATA_TYPE_4BIT_STRING];
    out.extend(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    out.push(DATA_TYPE_END_OF_LINE);
    out
}

/// Top and bottom field data of a `width` x `height` object of one code.
pub fn solid_rows(width: usize, height: usize, code: u8) -> (Vec<u8>, Vec<u8>) {
    let line = line_4bit(&vec![code; width]);
    let top_rows = (height + 1) / 2;
    let bottom_rows = height / 2;
    (line.repeat(top_rows), line.repeat(bottom_rows))
}

/// Object data payload with pixel coding.
pub fn object_segment_payload(object_id: u16, version: u8, top: &[u8], bottom: &[u8]) -> Vec<u8> {
    let mut out = object_id.to_be_bytes().to_vec();
    out.push(version << 4);
    out.extend((top.len() as u16).to_be_bytes());
    out.extend((bottom.len() as u16).to_be_bytes());
    out.extend_from_slice(top);
    out.extend_from_slice(bottom);
    out
}

/// Raw segment bytes including the header.
pub fn segment(segment_type: u8, page_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0x0F, segment_type];
    out.extend(page_id.to_be_bytes());
    out.extend((payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// A complete PES payload holding `segments`.
pub fn pes(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0x20, 0x00];
    for s in segments {
        out.extend_from_slice(s);
    }
    out.push(0xFF);
    out
}

pub fn page_payload(state: u8, regions: &[(u8, u16, u16)]) -> Vec<u8> {
    let mut out = vec![10, state << 2];
    for &(region_id, h, v) in regions {
        out.push(region_id);
        out.push(0xFF);
        out.extend(h.to_be_bytes());
        out.extend(v.to_be_bytes());
    }
    out
}

/// Region payload of depth 4-bit with bitmap objects at `(id, h, v)`.
pub fn region_payload(
    region_id: u8,
    width: u16,
    height: u16,
    clut_id: u8,
    fill: Option<u8>,
    objects: &[(u16, u16, u16)],
) -> Vec<u8> {
    let fill_flag = if fill.is_some() { 0x08 } else { 0x00 };
    let mut out = vec![region_id, fill_flag];
    out.extend(width.to_be_bytes());
    out.extend(height.to_be_bytes());
    out.push(0x48);
    out.push(clut_id);
    out.push(0x00);
    out.push(fill.unwrap_or(0) << 4);
    for &(object_id, h, v) in objects {
        out.extend(object_id.to_be_bytes());
        out.extend((h & 0x0FFF).to_be_bytes());
        out.extend((v & 0x0FFF).to_be_bytes());
    }
    out
}

/// CLUT payload of full-range 4-bit entries `(id, y, cr, cb, t)`.
pub fn clut_payload(clut_id: u8, entries: &[(u8, u8, u8, u8, u8)]) -> Vec<u8> {
    let mut out = vec![clut_id, 0x00];
    for &(entry_id, y, cr, cb, t) in entries {
        out.extend([entry_id, 0x41, y, cr, cb, t]);
    }
    out
}

pub fn page_segment(state: u8, regions: &[(u8, u16, u16)]) -> Segment {
    Segment::parse(0x10, 1, &page_payload(state, regions)).unwrap()
}

pub fn region_segment(
    region_id: u8,
    width: u16,
    height: u16,
    clut_id: u8,
    fill: Option<u8>,
    objects: &[(u16, u16, u16)],
) -> Segment {
    Segment::parse(0x11, 1, &region_payload(region_id, width, height, clut_id, fill, objects)).unwrap()
}

pub fn clut_segment(clut_id: u8, entries: &[(u8, u8, u8, u8, u8)]) -> Segment {
    Segment::parse(0x12, 1, &clut_payload(clut_id, entries)).unwrap()
}

pub fn object_segment(object_id: u16, version: u8, fields: &(Vec<u8>, Vec<u8>)) -> Segment {
    let payload = object_segment_payload(object_id, version, &fields.0, &fields.1);
    Segment::parse(0x13, 1, &payload).unwrap()
}

pub fn display_set(pts: u64, segments: Vec<Segment>) -> DisplaySet {
    DisplaySet {
        pts,
        segments,
        errors: Vec::new(),
    }
}

#[test]
fn test_bits_packing() {
    assert_eq!(bits("1"), vec![0x80]);
    assert_eq!(bits("0000 1111 101"), vec![0x0F, 0xA0]);
}

#[test]
fn test_line_4bit() {
    assert_eq!(line_4bit(&[1, 2]), vec![0x11, 0x12, 0x00, 0xF0]);
    assert_eq!(line_4bit(&[3]), vec![0x11, 0x30, 0x00, 0xF0]);
}
