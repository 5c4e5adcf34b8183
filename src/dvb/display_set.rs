//! Display set representation.

use std::sync::Arc;

use super::{
    ClutDefinition,
    Describe,
    DisplayDefinition,
    ObjectData,
    PageComposition,
    PageState,
    RegionComposition,
    Segment,
    SegmentBody,
    SegmentError,
    SegmentType,
    TreeNode,
};

/// All segments sharing one presentation timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplaySet {
    /// Presentation timestamp in 90kHz units
    pub pts: u64,
    /// Segments in arrival order
    pub segments: Vec<Segment>,
    /// Segments of this display set that failed to decode
    pub errors: Vec<SegmentError>,
}

impl DisplaySet {
    pub fn new(pts: u64) -> Self {
        Self {
            pts,
            segments: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Get the presentation timestamp in milliseconds.
    #[inline]
    pub fn pts_ms(&self) -> u32 {
        (self.pts / 90) as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The page composition in effect; the last one wins.
    pub fn page_composition(&self) -> Option<&PageComposition> {
        self.segments.iter().rev().find_map(|s| match &s.body {
            SegmentBody::PageComposition(page) => Some(page),
            _ => None,
        })
    }

    pub fn page_state(&self) -> Option<PageState> {
        self.page_composition().map(|p| p.state)
    }

    /// The last display definition of the display set.
    pub fn display_definition(&self) -> Option<&DisplayDefinition> {
        self.segments.iter().rev().find_map(|s| match &s.body {
            SegmentBody::DisplayDefinition(display) => Some(display),
            _ => None,
        })
    }

    pub fn regions(&self) -> impl Iterator<Item = &Arc<RegionComposition>> {
        self.segments.iter().filter_map(|s| match &s.body {
            SegmentBody::RegionComposition(region) => Some(region),
            _ => None,
        })
    }

    pub fn cluts(&self) -> impl Iterator<Item = &Arc<ClutDefinition>> {
        self.segments.iter().filter_map(|s| match &s.body {
            SegmentBody::ClutDefinition(clut) => Some(clut),
            _ => None,
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &Arc<ObjectData>> {
        self.segments.iter().filter_map(|s| match &s.body {
            SegmentBody::ObjectData(object) => Some(object),
            _ => None,
        })
    }

    /// Whether the display set cannot be used to update decoder state.
    ///
    /// That is the case when nothing in it decoded, or when one of its page
    /// compositions failed, leaving the page state unknown.
    pub fn is_malformed(&self) -> bool {
        let page_failed = self
            .errors
            .iter()
            .any(|e| e.segment_type == SegmentType::PageComposition as u8);
        self.segments.is_empty() || page_failed
    }
}

impl Describe for DisplaySet {
    fn describe(&self) -> TreeNode {
        let mut children = vec![TreeNode::scalar("pts", self.pts)];
        children.extend(self.segments.iter().map(|s| s.describe()));
        TreeNode::branch(format!("display set @ {} ms", self.pts_ms()), children)
    }
}
