//! Display Definition Segment parsing.

use super::{DecodeResult, Describe, TreeNode};
use crate::utils::BigEndianReader;

/// Canvas width assumed when no display definition has been received.
pub const DEFAULT_DISPLAY_WIDTH: u16 = 720;
/// Canvas height assumed when no display definition has been received.
pub const DEFAULT_DISPLAY_HEIGHT: u16 = 576;

/// Rectangle of the display the subtitles are confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    pub h_min: u16,
    pub h_max: u16,
    pub v_min: u16,
    pub v_max: u16,
}

/// Display Definition Segment specifies the canvas the page is composed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDefinition {
    /// Absent for the compact 4-byte form
    pub version: Option<u8>,
    pub width: u16,
    pub height: u16,
    pub window: Option<DisplayWindow>,
}

impl Default for DisplayDefinition {
    fn default() -> Self {
        Self {
            version: None,
            width: DEFAULT_DISPLAY_WIDTH,
            height: DEFAULT_DISPLAY_HEIGHT,
            window: None,
        }
    }
}

impl DisplayDefinition {
    /// Parse a display definition.
    ///
    /// The broadcast layout signals `width - 1` and `height - 1` after a version
    /// byte. A payload of exactly four bytes is read as literal width and height.
    pub fn parse(reader: &mut BigEndianReader, length: usize) -> DecodeResult<Self> {
        if length == 4 {
            let width = reader.read_u16()?;
            let height = reader.read_u16()?;
            return Ok(Self {
                version: None,
                width,
                height,
                window: None,
            });
        }

        let flags = reader.read_u8()?;
        let version = flags >> 4;
        let has_window = (flags & 0x08) != 0;
        let width = reader.read_u16()?.saturating_add(1);
        let height = reader.read_u16()?.saturating_add(1);

        let window = if has_window {
            Some(DisplayWindow {
                h_min: reader.read_u16()?,
                h_max: reader.read_u16()?,
                v_min: reader.read_u16()?,
                v_max: reader.read_u16()?,
            })
        } else {
            None
        };

        Ok(Self {
            version: Some(version),
            width,
            height,
            window,
        })
    }

    /// Offset added to region addresses on the canvas.
    pub fn origin(&self) -> (u16, u16) {
        self.window.map_or((0, 0), |w| (w.h_min, w.v_min))
    }
}

impl Describe for DisplayDefinition {
    fn describe(&self) -> TreeNode {
        let mut fields = Vec::new();
        if let Some(version) = self.version {
            fields.push(TreeNode::scalar("dds_version_number", version));
        }
        fields.push(TreeNode::scalar("display_width", self.width));
        fields.push(TreeNode::scalar("display_height", self.height));
        if let Some(w) = self.window {
            fields.push(TreeNode::branch(
                "display_window",
                vec![
                    TreeNode::scalar("display_window_horizontal_position_minimum", w.h_min),
                    TreeNode::scalar("display_window_horizontal_position_maximum", w.h_max),
                    TreeNode::scalar("display_window_vertical_position_minimum", w.v_min),
                    TreeNode::scalar("display_window_vertical_position_maximum", w.v_max),
                ],
            ));
        }
        TreeNode::branch("display_definition_segment", fields)
    }
}
