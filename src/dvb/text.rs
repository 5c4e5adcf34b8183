//! Text rendering collaborator for character-coded objects.
//!
//! Glyph shaping is not done here: the host supplies a [`TextRenderer`] through
//! the render resources, and the region compositor hands it one request per
//! character object.

use super::PixelDepth;

/// A string to draw into a region, in the region's pixel code space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest<'a> {
    pub text: &'a str,
    pub foreground_index: u8,
    pub background_index: u8,
    /// Space left between the object position and the region's right edge
    pub max_width: usize,
    /// Space left between the object position and the region's bottom edge
    pub max_height: usize,
    pub depth: PixelDepth,
}

/// Pixel codes produced by a text renderer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBitmap {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

pub trait TextRenderer: Send + Sync {
    /// Render `request.text` using only its foreground and background codes.
    fn render_text(&self, request: &TextRequest<'_>) -> Option<IndexedBitmap>;
}
