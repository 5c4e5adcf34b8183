//! Page rendering: composed regions resolved through their CLUTs onto a canvas.

use std::sync::Arc;

use log::{debug, warn};

use super::{
    apply_palette,
    compose_region,
    DecodeError,
    DecodeResult,
    DisplayDefinition,
    DisplaySet,
    EpochState,
    SubtitleStream,
    TextRenderer,
};
use crate::utils::alloc_raster;

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes
    pub rgba: Vec<u8>,
    /// Presentation timestamp in 90kHz units
    pub pts: u64,
    /// Seconds the page stays valid
    pub time_out: u8,
}

impl RenderedImage {
    /// RGBA bytes of one pixel, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba.get(i..i + 4)?.try_into().ok()
    }

    #[inline]
    pub fn timestamp_ms(&self) -> u32 {
        (self.pts / 90) as u32
    }
}

/// Background image used for canvases of its exact size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundTemplate {
    pub width: u32,
    pub height: u32,
    /// Packed RGBA, one `u32` per pixel
    pub rgba: Vec<u32>,
}

/// Immutable resources shared by every render call.
#[derive(Clone, Default)]
pub struct RenderResources {
    /// Packed RGBA used where no template matches; transparent by default
    pub background: u32,
    pub templates: Vec<BackgroundTemplate>,
    pub text_renderer: Option<Arc<dyn TextRenderer>>,
}

impl RenderResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, rgba: u32) -> Self {
        self.background = rgba;
        self
    }

    /// Add a template. Templates whose pixel count does not match their size
    /// are ignored.
    pub fn with_template(mut self, template: BackgroundTemplate) -> Self {
        let pixels = (template.width as usize).checked_mul(template.height as usize);
        if pixels == Some(template.rgba.len()) {
            self.templates.push(template);
        } else {
            warn!(
                "ignoring {}x{} background template with {} pixels",
                template.width,
                template.height,
                template.rgba.len()
            );
        }
        self
    }

    pub fn with_text_renderer(mut self, renderer: Arc<dyn TextRenderer>) -> Self {
        self.text_renderer = Some(renderer);
        self
    }

    fn canvas(&self, width: u32, height: u32) -> DecodeResult<Vec<u32>> {
        match self.templates.iter().find(|t| t.width == width && t.height == height) {
            Some(template) => Ok(template.rgba.clone()),
            None => alloc_raster(self.background, width as usize, height as usize),
        }
    }
}

impl std::fmt::Debug for RenderResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderResources")
            .field("background", &format_args!("0x{:08x}", self.background))
            .field("templates", &self.templates.len())
            .field("text_renderer", &self.text_renderer.is_some())
            .finish()
    }
}

/// Renders display sets of a stream into RGBA images.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    resources: Arc<RenderResources>,
}

impl PageRenderer {
    pub fn new(resources: Arc<RenderResources>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &RenderResources {
        &self.resources
    }

    /// Render the accepted display set at `index`.
    ///
    /// The epoch is replayed from its first display set, so the result does
    /// not depend on which display sets were rendered before.
    pub fn render(&self, stream: &SubtitleStream, index: usize) -> Option<RenderedImage> {
        let display_set = stream.display_set(index)?;
        let state = stream.replay(index)?;
        match self.render_display_set(&state, display_set) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("cannot render display set {}: {}", index, err);
                None
            }
        }
    }

    /// Render `display_set` against the accumulated `state` of its epoch.
    ///
    /// Fails only when the canvas is too large to allocate. Regions that are
    /// too large are skipped.
    pub fn render_display_set(
        &self,
        state: &EpochState,
        display_set: &DisplaySet,
    ) -> DecodeResult<RenderedImage> {
        let default_display = DisplayDefinition::default();
        let display = display_set
            .display_definition()
            .or_else(|| state.display_definition())
            .unwrap_or(&default_display);

        let width = display.width as u32;
        let height = display.height as u32;
        let (origin_x, origin_y) = display.origin();
        let mut canvas = self.resources.canvas(width, height)?;

        let page = display_set.page_composition().or_else(|| state.page_composition());
        let time_out = page.map_or(0, |p| p.time_out);
        let text = self.resources.text_renderer.as_deref();

        for placement in page.map(|p| p.regions.as_slice()).unwrap_or_default() {
            let Some(region) = state.region(placement.region_id) else {
                warn!("{}", DecodeError::MissingRegion(placement.region_id));
                continue;
            };
            let Some(clut) = state.clut(region.clut_id) else {
                let err = DecodeError::MissingClut {
                    region_id: region.region_id,
                    clut_id: region.clut_id,
                };
                warn!("{}", err);
                continue;
            };

            let raster = match compose_region(region, state, text) {
                Ok(raster) => raster,
                Err(err) => {
                    warn!("skipping region {}: {}", region.region_id, err);
                    continue;
                }
            };
            let mut rgba = vec![0u32; raster.pixels.len()];
            apply_palette(&raster.pixels, clut.palette(region.depth), &mut rgba);

            let x0 = (placement.h_address as u32).saturating_add(origin_x as u32);
            let y0 = (placement.v_address as u32).saturating_add(origin_y as u32);
            let visible_w = (raster.width as u32).min(width.saturating_sub(x0)) as usize;
            let visible_h = (raster.height as u32).min(height.saturating_sub(y0)) as usize;
            if visible_w < raster.width || visible_h < raster.height {
                debug!(
                    "region {} at ({}, {}) clipped to {}x{}",
                    region.region_id, x0, y0, visible_w, visible_h
                );
            }

            for y in 0..visible_h {
                let src = y * raster.width;
                let dst = (y0 as usize + y) * width as usize + x0 as usize;
                canvas[dst..dst + visible_w].copy_from_slice(&rgba[src..src + visible_w]);
            }
        }

        Ok(RenderedImage {
            width,
            height,
            rgba: canvas.iter().flat_map(|&c| c.to_le_bytes()).collect(),
            pts: display_set.pts,
            time_out,
        })
    }
}
