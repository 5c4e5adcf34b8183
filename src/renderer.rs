//! JavaScript facade over one DVB subtitle stream.
//!
//! The host demultiplexes the transport stream and pushes subtitle PES
//! payloads with their timestamps; frames are rendered on demand.

use std::sync::Arc;

use js_sys::{Float64Array, Uint8Array};
use log::warn;
use wasm_bindgen::prelude::*;

use crate::dvb::{
    Describe,
    PageRenderer,
    PesPacket,
    RenderResources,
    RenderedImage,
    StreamConfig,
    SubtitleStream,
};
use crate::utils::rgb_to_rgba;

/// DVB subtitle decoder and renderer exposed to JavaScript.
#[wasm_bindgen]
pub struct DvbSubRenderer {
    stream: SubtitleStream,
    renderer: PageRenderer,
    /// Most recently scanned packet, for diagnostics
    last_packet: Option<PesPacket>,
}

#[wasm_bindgen]
impl DvbSubRenderer {
    /// Create a renderer that keeps segments of every page.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default(), RenderResources::new())
    }

    /// Create a renderer for one composition page and its ancillary page.
    #[wasm_bindgen(js_name = forPages)]
    pub fn for_pages(composition_page_id: u16, ancillary_page_id: u16) -> Self {
        Self::with_config(
            StreamConfig::new(composition_page_id, ancillary_page_id),
            RenderResources::new(),
        )
    }

    /// Set the canvas background colour. Takes effect for later renders.
    #[wasm_bindgen(js_name = setBackground)]
    pub fn set_background(&mut self, r: u8, g: u8, b: u8, a: u8) {
        let resources = self
            .renderer
            .resources()
            .clone()
            .with_background(rgb_to_rgba(r, g, b, a));
        self.renderer = PageRenderer::new(Arc::new(resources));
    }

    /// Push one PES payload with its presentation timestamp (90kHz units).
    /// Returns the number of segments parsed, or -1 if the payload is unusable.
    #[wasm_bindgen(js_name = pushPacket)]
    pub fn push_packet(&mut self, data: &[u8], pts: f64) -> i32 {
        match self.stream.push_packet(data, pts.max(0.0) as u64) {
            Ok(packet) => {
                let count = packet.segments.len() as i32;
                self.last_packet = Some(packet);
                count
            }
            Err(err) => {
                warn!("rejecting PES payload of {} bytes: {}", data.len(), err);
                -1
            }
        }
    }

    /// Close the pending display set. Call at end of stream.
    /// Returns its index, or -1 if it was not accepted.
    #[wasm_bindgen]
    pub fn flush(&mut self) -> i32 {
        self.stream.flush().map_or(-1, |i| i as i32)
    }

    /// Get the number of accepted display sets.
    #[wasm_bindgen(getter)]
    pub fn count(&self) -> usize {
        self.stream.count()
    }

    /// Get all timestamps in milliseconds as a Float64Array.
    #[wasm_bindgen(js_name = getTimestamps)]
    pub fn get_timestamps(&self) -> Float64Array {
        let timestamps = self.stream.timestamps_ms();
        let arr = Float64Array::new_with_length(timestamps.len() as u32);
        for (i, &ts) in timestamps.iter().enumerate() {
            arr.set_index(i as u32, ts as f64);
        }
        arr
    }

    /// Find the display set index for a given timestamp in milliseconds.
    #[wasm_bindgen(js_name = findIndexAtTimestamp)]
    pub fn find_index_at_timestamp(&self, time_ms: f64) -> i32 {
        if time_ms < 0.0 {
            return -1;
        }
        self.stream
            .find_index_at_timestamp(time_ms as u32)
            .map_or(-1, |i| i as i32)
    }

    /// Render the display set at the given index.
    /// Returns null if the index is invalid.
    #[wasm_bindgen(js_name = renderAtIndex)]
    pub fn render_at_index(&self, index: usize) -> Option<RenderResult> {
        self.renderer.render(&self.stream, index).map(RenderResult::from)
    }

    /// Render the display set shown at the given timestamp in seconds.
    #[wasm_bindgen(js_name = renderAtTimestamp)]
    pub fn render_at_timestamp(&self, time_seconds: f64) -> Option<RenderResult> {
        let index = self.find_index_at_timestamp(time_seconds * 1000.0);
        if index < 0 {
            return None;
        }
        self.render_at_index(index as usize)
    }

    /// Segment tree of the most recently pushed packet as indented text.
    #[wasm_bindgen(js_name = describeLastPacket)]
    pub fn describe_last_packet(&self) -> String {
        self.last_packet
            .as_ref()
            .map(|p| p.describe().to_string())
            .unwrap_or_default()
    }

    /// Drop all display sets and return to awaiting an acquisition point.
    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.stream.clear();
        self.last_packet = None;
    }
}

impl DvbSubRenderer {
    /// Create a renderer with explicit page selection and render resources.
    pub fn with_config(config: StreamConfig, resources: RenderResources) -> Self {
        Self {
            stream: SubtitleStream::new(config),
            renderer: PageRenderer::new(Arc::new(resources)),
            last_packet: None,
        }
    }

    pub fn stream(&self) -> &SubtitleStream {
        &self.stream
    }
}

impl Default for DvbSubRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A rendered subtitle page.
#[wasm_bindgen]
pub struct RenderResult {
    image: RenderedImage,
}

impl From<RenderedImage> for RenderResult {
    fn from(image: RenderedImage) -> Self {
        Self { image }
    }
}

#[wasm_bindgen]
impl RenderResult {
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.image.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.image.height
    }

    /// Presentation time in milliseconds.
    #[wasm_bindgen(getter)]
    pub fn timestamp(&self) -> f64 {
        self.image.timestamp_ms() as f64
    }

    /// Seconds the page stays on screen.
    #[wasm_bindgen(getter, js_name = timeOut)]
    pub fn time_out(&self) -> u8 {
        self.image.time_out
    }

    /// Get RGBA pixel data as Uint8Array.
    #[wasm_bindgen(js_name = getRgba)]
    pub fn get_rgba(&self) -> Uint8Array {
        Uint8Array::from(&self.image.rgba[..])
    }
}

impl RenderResult {
    pub fn image(&self) -> &RenderedImage {
        &self.image
    }
}
