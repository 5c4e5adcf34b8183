//! Page Composition Segment parsing.

use super::{DecodeError, DecodeResult, Describe, TreeNode};
use crate::utils::BigEndianReader;

/// Page state signalled by a page composition segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Normal case - the page is an update of the previous one
    Normal,
    /// Acquisition point - the complete page is (re)sent
    AcquisitionPoint,
    /// Mode change - a new epoch with a new memory plan
    ModeChange,
}

impl PageState {
    /// Decode the 2-bit `page_state` field. Value 3 is reserved.
    pub fn from_bits(bits: u8) -> DecodeResult<Self> {
        match bits & 0x03 {
            0 => Ok(PageState::Normal),
            1 => Ok(PageState::AcquisitionPoint),
            2 => Ok(PageState::ModeChange),
            _ => Err(DecodeError::ReservedPageState),
        }
    }

    /// Whether a display set with this state starts a new epoch.
    #[inline]
    pub fn starts_epoch(self) -> bool {
        matches!(self, PageState::AcquisitionPoint | PageState::ModeChange)
    }

    pub fn name(self) -> &'static str {
        match self {
            PageState::Normal => "normal case",
            PageState::AcquisitionPoint => "acquisition point",
            PageState::ModeChange => "mode change",
        }
    }
}

/// Placement of one region on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPlacement {
    pub region_id: u8,
    pub h_address: u16,
    pub v_address: u16,
}

/// Page Composition Segment lists the visible regions and their positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageComposition {
    /// Seconds the page may stay on screen
    pub time_out: u8,
    pub version: u8,
    pub state: PageState,
    pub regions: Vec<RegionPlacement>,
}

impl PageComposition {
    pub fn parse(reader: &mut BigEndianReader) -> DecodeResult<Self> {
        let time_out = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let version = flags >> 4;
        let state = PageState::from_bits(flags >> 2)?;

        // Each region entry is 6 bytes: id, reserved, h address, v address
        let mut regions = Vec::with_capacity(reader.remaining() / 6);
        while reader.remaining() >= 6 {
            let region_id = reader.read_u8()?;
            reader.skip(1)?;
            let h_address = reader.read_u16()?;
            let v_address = reader.read_u16()?;

            regions.push(RegionPlacement {
                region_id,
                h_address,
                v_address,
            });
        }

        Ok(Self {
            time_out,
            version,
            state,
            regions,
        })
    }
}

impl Describe for PageComposition {
    fn describe(&self) -> TreeNode {
        let regions = self
            .regions
            .iter()
            .map(|r| {
                TreeNode::branch(
                    format!("region {}", r.region_id),
                    vec![
                        TreeNode::scalar("region_horizontal_address", r.h_address),
                        TreeNode::scalar("region_vertical_address", r.v_address),
                    ],
                )
            })
            .collect();

        TreeNode::branch(
            "page_composition_segment",
            vec![
                TreeNode::scalar("page_time_out", self.time_out),
                TreeNode::scalar("page_version_number", self.version),
                TreeNode::scalar("page_state", self.state.name()),
                TreeNode::branch("regions", regions),
            ],
        )
    }
}
