//! Display set assembly for one subtitle elementary stream.
//!
//! Packets arrive in order with their presentation timestamps. Segments of
//! packets sharing a timestamp form one display set, which is handed to the
//! epoch tracker once it is complete: when a packet with another timestamp
//! arrives, when an end of display set segment is seen, or on [`SubtitleStream::flush`].

use log::debug;

use super::{scan_payload, DecodeResult, DisplaySet, EpochState, EpochTracker, PesPacket};
use crate::utils::binary_search_timestamp;

/// Page selection for a stream.
///
/// With no page id configured every segment is kept. Otherwise only segments
/// of the composition page or the ancillary page are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamConfig {
    pub composition_page_id: Option<u16>,
    pub ancillary_page_id: Option<u16>,
}

impl StreamConfig {
    pub fn new(composition_page_id: u16, ancillary_page_id: u16) -> Self {
        Self {
            composition_page_id: Some(composition_page_id),
            ancillary_page_id: Some(ancillary_page_id),
        }
    }

    pub fn accepts(&self, page_id: u16) -> bool {
        match (self.composition_page_id, self.ancillary_page_id) {
            (None, None) => true,
            (composition, ancillary) => composition == Some(page_id) || ancillary == Some(page_id),
        }
    }
}

/// Decoder for one subtitle elementary stream.
#[derive(Debug, Clone, Default)]
pub struct SubtitleStream {
    config: StreamConfig,
    tracker: EpochTracker,
    pending: Option<DisplaySet>,
    /// Timestamps in milliseconds of accepted display sets, for lookup
    timestamps_ms: Vec<u32>,
}

impl SubtitleStream {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Feed one PES payload with its presentation timestamp (90kHz).
    ///
    /// Returns the scanned packet, including segments of other pages. Fails
    /// only when the payload is too short to carry its header.
    pub fn push_packet(&mut self, payload: &[u8], pts: u64) -> DecodeResult<PesPacket> {
        let packet = scan_payload(payload)?;

        if self.pending.as_ref().is_some_and(|p| p.pts != pts) {
            self.flush();
        }

        let config = self.config;
        let display_set = self.pending.get_or_insert_with(|| DisplaySet::new(pts));
        display_set.errors.extend(
            packet
                .errors
                .iter()
                .filter(|e| e.page_id.map_or(true, |page| config.accepts(page)))
                .cloned(),
        );

        let mut complete = false;
        for segment in &packet.segments {
            if !config.accepts(segment.page_id) {
                debug!("ignoring segment of page {}", segment.page_id);
                continue;
            }
            if segment.is_end_of_display_set() {
                complete = true;
            }
            display_set.segments.push(segment.clone());
        }

        if complete {
            self.flush();
        }
        Ok(packet)
    }

    /// Close the pending display set and hand it to the tracker.
    ///
    /// Returns the index it was accepted at, if it was.
    pub fn flush(&mut self) -> Option<usize> {
        let display_set = self.pending.take()?;
        let timestamp = display_set.pts_ms();
        let index = self.tracker.accept(display_set)?;
        self.timestamps_ms.push(timestamp);
        Some(index)
    }

    /// Number of accepted display sets.
    pub fn count(&self) -> usize {
        self.tracker.display_sets().len()
    }

    pub fn display_set(&self, index: usize) -> Option<&DisplaySet> {
        self.tracker.display_set(index)
    }

    pub fn tracker(&self) -> &EpochTracker {
        &self.tracker
    }

    pub fn timestamps_ms(&self) -> &[u32] {
        &self.timestamps_ms
    }

    /// Index of the last display set shown at `time_ms`, if any.
    pub fn find_index_at_timestamp(&self, time_ms: u32) -> Option<usize> {
        if self.timestamps_ms.first().map_or(true, |&first| time_ms < first) {
            return None;
        }
        Some(binary_search_timestamp(&self.timestamps_ms, time_ms))
    }

    /// Accumulated state of display set `index`, replayed from its epoch start.
    pub fn replay(&self, index: usize) -> Option<EpochState> {
        self.tracker.replay(index)
    }

    /// Drop everything, including the pending display set.
    pub fn clear(&mut self) {
        self.tracker.clear();
        self.pending = None;
        self.timestamps_ms.clear();
    }
}
