use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{LocalDateTime, PricePoint};

/// Merges price points from several feeds into one chronological series.
///
/// Points sharing a timestamp are resolved by source priority (actual
/// tariffs beat predictions); on equal priority the first point seen stays.
#[derive(Debug, Default)]
pub struct PriceSeriesMerger {
    slots: BTreeMap<LocalDateTime, PricePoint>,
    received: usize,
}

impl PriceSeriesMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: PricePoint) {
        self.received += 1;
        match self.slots.entry(point.time_start) {
            Entry::Vacant(slot) => {
                slot.insert(point);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().source.priority() > point.source.priority() {
                    slot.insert(point);
                }
            }
        }
    }

    pub fn extend(&mut self, points: impl IntoIterator<Item = PricePoint>) {
        for point in points {
            self.push(point);
        }
    }

    /// Number of points pushed, before deduplication
    pub fn received(&self) -> usize {
        self.received
    }

    /// Deduplicated series in strictly ascending time order
    pub fn merged(self) -> Vec<PricePoint> {
        let merged: Vec<PricePoint> = self.slots.into_values().collect();
        debug!(unique = merged.len(), "combined unique price points");
        merged
    }

    /// Deduplicated series with slots that have fully elapsed removed
    pub fn merged_from(self, now: &LocalDateTime) -> Vec<PricePoint> {
        future_slots(self.merged(), now)
    }
}

/// Keep slots whose end is strictly after `now`; the slot in progress stays.
pub fn future_slots(points: Vec<PricePoint>, now: &LocalDateTime) -> Vec<PricePoint> {
    let future: Vec<PricePoint> = points
        .into_iter()
        .filter(|p| p.time_end() > *now)
        .collect();
    debug!(future = future.len(), "filtered to future price points");
    future
}

/// Count of merged points per source, for run summaries
pub fn source_breakdown(points: &[PricePoint]) -> (usize, usize) {
    let predicted = points
        .iter()
        .filter(|p| !p.source.is_actual())
        .count();
    (points.len() - predicted, predicted)
}
