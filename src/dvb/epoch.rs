//! Epoch tracking and accumulated decoder state.
//!
//! Regions, CLUTs and objects are identified per epoch. A display set only
//! carries what changed, so the state needed to render it is the result of
//! merging every display set of its epoch, in arrival order, up to itself.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use super::{
    ClutDefinition,
    DisplayDefinition,
    DisplaySet,
    ObjectData,
    PageComposition,
    PageState,
    RegionComposition,
    SegmentBody,
};

/// Region, CLUT and object maps accumulated over an epoch.
#[derive(Debug, Clone, Default)]
pub struct EpochState {
    regions: HashMap<u8, Arc<RegionComposition>>,
    cluts: HashMap<u8, Arc<ClutDefinition>>,
    objects: HashMap<u16, Arc<ObjectData>>,
    display: Option<DisplayDefinition>,
    page: Option<PageComposition>,
}

impl EpochState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state of the last display set in `display_sets`, which must
    /// start at the beginning of an epoch.
    pub fn replay(display_sets: &[DisplaySet]) -> Self {
        let mut state = Self::new();
        for display_set in display_sets {
            state.merge(display_set);
        }
        state
    }

    /// Forget everything; used at epoch boundaries.
    pub fn reset(&mut self) {
        self.regions.clear();
        self.cluts.clear();
        self.objects.clear();
        self.display = None;
        self.page = None;
    }

    /// Merge a display set. Segments with an id already present replace it.
    pub fn merge(&mut self, display_set: &DisplaySet) {
        for segment in &display_set.segments {
            match &segment.body {
                SegmentBody::PageComposition(page) => self.page = Some(page.clone()),
                SegmentBody::RegionComposition(region) => {
                    self.regions.insert(region.region_id, Arc::clone(region));
                }
                SegmentBody::ClutDefinition(clut) => {
                    self.cluts.insert(clut.clut_id, Arc::clone(clut));
                }
                SegmentBody::ObjectData(object) => {
                    self.objects.insert(object.object_id, Arc::clone(object));
                }
                SegmentBody::DisplayDefinition(display) => self.display = Some(display.clone()),
                SegmentBody::Opaque => {}
            }
        }
    }

    pub fn region(&self, region_id: u8) -> Option<&RegionComposition> {
        self.regions.get(&region_id).map(|r| r.as_ref())
    }

    pub fn clut(&self, clut_id: u8) -> Option<&ClutDefinition> {
        self.cluts.get(&clut_id).map(|c| c.as_ref())
    }

    pub fn object(&self, object_id: u16) -> Option<&ObjectData> {
        self.objects.get(&object_id).map(|o| o.as_ref())
    }

    /// Most recent display definition of the epoch.
    pub fn display_definition(&self) -> Option<&DisplayDefinition> {
        self.display.as_ref()
    }

    /// Most recent page composition of the epoch.
    pub fn page_composition(&self) -> Option<&PageComposition> {
        self.page.as_ref()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn clut_count(&self) -> usize {
        self.cluts.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.cluts.is_empty() && self.objects.is_empty()
    }
}

/// Tracker state for one subtitle stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No acquisition point or mode change seen yet
    AwaitingAcquisition,
    InEpoch,
}

/// Inclusive range of accepted display-set indices forming one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    pub first: usize,
    pub last: usize,
}

impl Epoch {
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }
}

/// Accepts complete display sets in arrival order and groups them into epochs.
#[derive(Debug, Clone)]
pub struct EpochTracker {
    state: TrackerState,
    live: EpochState,
    display_sets: Vec<DisplaySet>,
    epochs: Vec<Epoch>,
}

impl EpochTracker {
    pub fn new() -> Self {
        Self {
            state: TrackerState::AwaitingAcquisition,
            live: EpochState::new(),
            display_sets: Vec::new(),
            epochs: Vec::new(),
        }
    }

    /// Accept a display set.
    ///
    /// Returns its index among accepted display sets, or `None` when it was
    /// skipped: malformed display sets and normal updates before the first
    /// acquisition point leave the tracker untouched.
    pub fn accept(&mut self, display_set: DisplaySet) -> Option<usize> {
        if display_set.is_malformed() {
            warn!(
                "skipping malformed display set at pts {} ({} segment errors)",
                display_set.pts,
                display_set.errors.len()
            );
            return None;
        }

        let index = self.display_sets.len();
        let page_state = display_set.page_state().unwrap_or(PageState::Normal);

        match (self.state, page_state) {
            (_, PageState::AcquisitionPoint | PageState::ModeChange) => {
                if self.state == TrackerState::InEpoch {
                    debug!("epoch closed by {} at pts {}", page_state.name(), display_set.pts);
                }
                debug!("epoch started at pts {}", display_set.pts);
                self.live.reset();
                self.epochs.push(Epoch {
                    first: index,
                    last: index,
                });
                self.state = TrackerState::InEpoch;
            }
            (TrackerState::AwaitingAcquisition, PageState::Normal) => {
                debug!("skipping normal display set at pts {} before acquisition", display_set.pts);
                return None;
            }
            (TrackerState::InEpoch, PageState::Normal) => {
                if let Some(epoch) = self.epochs.last_mut() {
                    epoch.last = index;
                }
            }
        }

        self.live.merge(&display_set);
        self.display_sets.push(display_set);
        Some(index)
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// State accumulated through the most recently accepted display set.
    pub fn live_state(&self) -> &EpochState {
        &self.live
    }

    pub fn display_sets(&self) -> &[DisplaySet] {
        &self.display_sets
    }

    pub fn display_set(&self, index: usize) -> Option<&DisplaySet> {
        self.display_sets.get(index)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Epoch containing the display set at `index`.
    pub fn epoch_of(&self, index: usize) -> Option<&Epoch> {
        let position = self.epochs.partition_point(|e| e.last < index);
        self.epochs.get(position).filter(|e| e.contains(index))
    }

    /// Rebuild the state of display set `index` from the start of its epoch.
    pub fn replay(&self, index: usize) -> Option<EpochState> {
        let epoch = self.epoch_of(index)?;
        Some(EpochState::replay(&self.display_sets[epoch.first..=index]))
    }

    /// Drop all display sets and return to awaiting acquisition.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for EpochTracker {
    fn default() -> Self {
        Self::new()
    }
}
