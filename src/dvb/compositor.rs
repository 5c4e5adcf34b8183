//! Region composition: object rasters drawn into a region's index raster.

use log::{trace, warn};

use crate::utils::alloc_raster;

use super::{
    DecodeError,
    DecodeResult,
    EpochState,
    ObjectData,
    PixelDepth,
    RegionComposition,
    RegionObject,
    TextRenderer,
    TextRequest,
};

/// Pixel codes of one composed region, in the region's depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRaster {
    pub width: usize,
    pub height: usize,
    pub depth: PixelDepth,
    pub pixels: Vec<u8>,
}

impl RegionRaster {
    pub fn new(width: usize, height: usize, depth: PixelDepth) -> DecodeResult<Self> {
        Ok(Self {
            width,
            height,
            depth,
            pixels: alloc_raster(0, width, height)?,
        })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Copy a `width` x `height` source onto the raster at `(x0, y0)`,
    /// clipped to the raster. Positions where `source` yields `None` are kept.
    fn blit<F>(&mut self, x0: usize, y0: usize, width: usize, height: usize, mut source: F)
    where
        F: FnMut(usize, usize) -> Option<u8>,
    {
        let visible_w = width.min(self.width.saturating_sub(x0));
        let visible_h = height.min(self.height.saturating_sub(y0));

        for y in 0..visible_h {
            let row = (y0 + y) * self.width + x0;
            for x in 0..visible_w {
                if let Some(code) = source(x, y) {
                    self.pixels[row + x] = code;
                }
            }
        }
    }
}

/// Compose a region from the objects it references in `state`.
///
/// Objects are drawn in list order, later ones overwriting earlier ones.
/// Objects missing from `state` or without a usable raster are skipped.
/// Fails only when the region is too large to allocate.
pub fn compose_region(
    region: &RegionComposition,
    state: &EpochState,
    text: Option<&dyn TextRenderer>,
) -> DecodeResult<RegionRaster> {
    let mut raster = RegionRaster::new(region.width as usize, region.height as usize, region.depth)?;

    if let Some(fill) = region.fill_index() {
        raster.pixels.fill(fill);
    }

    for placement in &region.objects {
        let Some(object) = state.object(placement.object_id) else {
            let err = DecodeError::MissingObject {
                region_id: region.region_id,
                object_id: placement.object_id,
            };
            warn!("{}", err);
            continue;
        };

        if object.is_text() || placement.object_type.is_text() {
            if let Some(characters) = object.text() {
                draw_text(&mut raster, region, placement, &characters, text);
                continue;
            }
        }

        draw_bitmap(&mut raster, placement, object);
    }

    Ok(raster)
}

fn draw_bitmap(raster: &mut RegionRaster, placement: &RegionObject, object: &ObjectData) {
    let Some(source) = object.raster() else {
        return;
    };

    let depth = raster.depth;
    let keep_code_1 = object.non_modifying_colour;
    raster.blit(
        placement.h_offset as usize,
        placement.v_offset as usize,
        source.width,
        source.height,
        |x, y| {
            let code = source.pixel(x, y);
            if keep_code_1 && code == 1 {
                None
            } else {
                Some(source.remap(code, depth))
            }
        },
    );
}

fn draw_text(
    raster: &mut RegionRaster,
    region: &RegionComposition,
    placement: &RegionObject,
    characters: &str,
    text: Option<&dyn TextRenderer>,
) {
    let Some(renderer) = text else {
        trace!(
            "no text renderer, skipping character object {} in region {}",
            placement.object_id,
            region.region_id
        );
        return;
    };

    let x0 = placement.h_offset as usize;
    let y0 = placement.v_offset as usize;
    let request = TextRequest {
        text: characters,
        foreground_index: placement.foreground_index.unwrap_or(1),
        background_index: placement.background_index.unwrap_or(0),
        max_width: raster.width.saturating_sub(x0),
        max_height: raster.height.saturating_sub(y0),
        depth: region.depth,
    };

    let Some(bitmap) = renderer.render_text(&request) else {
        return;
    };
    let complete = bitmap
        .width
        .checked_mul(bitmap.height)
        .is_some_and(|len| bitmap.pixels.len() >= len);
    if !complete {
        warn!(
            "text renderer returned {} pixels for a {}x{} bitmap",
            bitmap.pixels.len(),
            bitmap.width,
            bitmap.height
        );
        return;
    }

    raster.blit(x0, y0, bitmap.width, bitmap.height, |x, y| {
        Some(bitmap.pixels[y * bitmap.width + x])
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvb::testutil::{display_set, object_segment, page_segment, region_segment, solid_rows};
    use crate::dvb::{
        IndexedBitmap,
        ObjectCoding,
        ObjectType,
        Segment,
        SegmentBody,
        DATA_TYPE_2BIT_STRING,
        DATA_TYPE_4BIT_STRING,
        DATA_TYPE_END_OF_LINE,
    };

    fn state_with(segments: Vec<Segment>) -> EpochState {
        let mut all = vec![page_segment(1, &[])];
        all.extend(segments);
        EpochState::replay(&[display_set(0, all)])
    }

    fn region_of(segment: &Segment) -> &RegionComposition {
        match &segment.body {
            SegmentBody::RegionComposition(region) => region,
            _ => panic!("not a region"),
        }
    }

    #[test]
    fn test_fill_and_later_objects_overwrite() {
        let region = region_segment(1, 4, 2, 1, Some(6), &[(1, 0, 0), (2, 1, 0)]);
        let state = state_with(vec![
            object_segment(1, 0, &solid_rows(2, 2, 3)),
            object_segment(2, 0, &solid_rows(2, 1, 9)),
        ]);
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert_eq!((raster.width, raster.height), (4, 2));
        assert_eq!(raster.pixels, vec![3, 9, 9, 6, 3, 3, 6, 6]);
    }

    #[test]
    fn test_object_is_clipped() {
        let region = region_segment(1, 3, 3, 1, None, &[(1, 2, 2)]);
        let state = state_with(vec![object_segment(1, 0, &solid_rows(4, 4, 5))]);
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert_eq!(raster.pixels, vec![0, 0, 0, 0, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn test_missing_object_is_skipped() {
        let region = region_segment(1, 2, 1, 1, Some(2), &[(7, 0, 0), (1, 1, 0)]);
        let state = state_with(vec![object_segment(1, 0, &solid_rows(1, 1, 4))]);
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert_eq!(raster.pixels, vec![2, 4]);
    }

    #[test]
    fn test_non_modifying_colour_keeps_code_1() {
        let region = region_segment(1, 3, 1, 1, Some(8), &[(1, 0, 0)]);
        let top = vec![DATA_TYPE_4BIT_STRING, 0x12, 0x10, 0x00, DATA_TYPE_END_OF_LINE];
        let object = ObjectData::new(
            1,
            0,
            true,
            ObjectCoding::Bitmap {
                top_field: top,
                bottom_field: Vec::new(),
            },
        );
        let mut state = state_with(Vec::new());
        state.merge(&display_set(
            1,
            vec![Segment {
                segment_type: 0x13,
                page_id: 1,
                payload: Vec::new(),
                body: SegmentBody::ObjectData(std::sync::Arc::new(object)),
            }],
        ));
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert_eq!(raster.pixels, vec![8, 2, 8]);
    }

    #[test]
    fn test_oversized_region_is_refused() {
        let region = region_segment(1, 0xFFFF, 0xFFFF, 1, Some(1), &[]);
        let state = state_with(Vec::new());
        assert_eq!(
            compose_region(region_of(&region), &state, None),
            Err(DecodeError::RasterTooLarge {
                width: 0xFFFF,
                height: 0xFFFF
            })
        );
    }

    #[test]
    fn test_two_bit_object_remapped_into_four_bit_region() {
        let region = region_segment(1, 4, 1, 1, None, &[(1, 0, 0)]);
        // 2-bit codes 1 2 3 0 then end of string
        let top = vec![DATA_TYPE_2BIT_STRING, 0b0110_1100, 0b0100_0000, DATA_TYPE_END_OF_LINE];
        let state = state_with(vec![object_segment(1, 0, &(top, Vec::new()))]);
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert_eq!(raster.depth, PixelDepth::FourBit);
        assert_eq!(raster.pixels, vec![0x7, 0x8, 0xF, 0x0]);
    }

    struct BlockText;

    impl TextRenderer for BlockText {
        fn render_text(&self, request: &TextRequest<'_>) -> Option<IndexedBitmap> {
            let width = request.text.chars().count().min(request.max_width);
            let mut pixels = vec![request.background_index; width * 2];
            pixels[..width].fill(request.foreground_index);
            Some(IndexedBitmap {
                width,
                height: 2,
                pixels,
            })
        }
    }

    fn text_state() -> (Segment, EpochState) {
        let mut region = region_segment(1, 4, 2, 1, Some(0), &[(3, 1, 0)]);
        if let SegmentBody::RegionComposition(r) = &mut region.body {
            let r = std::sync::Arc::make_mut(r);
            r.objects[0].object_type = ObjectType::Character;
            r.objects[0].foreground_index = Some(5);
            r.objects[0].background_index = Some(6);
        }
        let text = Segment::parse(0x13, 1, &[0x00, 0x03, 0x04, 0x02, 0x00, 0x48, 0x00, 0x69]).unwrap();
        (region, state_with(vec![text]))
    }

    #[test]
    fn test_text_object_uses_renderer() {
        let (region, state) = text_state();
        let renderer: &dyn TextRenderer = &BlockText;
        let raster = compose_region(region_of(&region), &state, Some(renderer)).unwrap();
        assert_eq!(raster.pixels, vec![0, 5, 5, 0, 0, 6, 6, 0]);
    }

    #[test]
    fn test_text_object_without_renderer_is_skipped() {
        let (region, state) = text_state();
        let raster = compose_region(region_of(&region), &state, None).unwrap();
        assert!(raster.pixels.iter().all(|&p| p == 0));
    }
}
