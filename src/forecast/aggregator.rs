use chrono::NaiveDate;
use chrono_tz::Tz;
use itertools::Itertools;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::domain::{round_to, BlockKey, LocalDateTime, TimeBlock};
use crate::ingest;

/// Rounded mean price per block and effective date.
///
/// A key that is absent means no data was seen for it, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockAverages(BTreeMap<BlockKey, f64>);

impl BlockAverages {
    pub fn get(&self, key: &BlockKey) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &BlockKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct effective dates, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        // BTreeMap keys are ordered by date first
        self.0.keys().map(|k| k.date).dedup().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, &f64)> {
        self.0.iter()
    }
}

impl FromIterator<(BlockKey, f64)> for BlockAverages {
    fn from_iter<I: IntoIterator<Item = (BlockKey, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Counters for one aggregation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub accepted: usize,
    pub skipped: usize,
    pub unclassified: usize,
}

/// Buckets price points by block and averages each bucket
#[derive(Debug, Default)]
pub struct PriceAggregator {
    buckets: BTreeMap<BlockKey, Vec<f64>>,
    stats: AggregationStats,
}

impl PriceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add every raw feed entry; malformed ones are counted and skipped
    pub fn from_records(records: &[Value], tz: &Tz) -> Self {
        let mut aggregator = Self::new();
        for record in records {
            match ingest::parse_entry(record, tz) {
                Ok((at, price)) => aggregator.add(&at, price),
                Err(reason) => {
                    debug!(%reason, "skipping forecast entry");
                    aggregator.stats.skipped += 1;
                }
            }
        }
        aggregator
    }

    /// Add one validated point
    pub fn add(&mut self, at: &LocalDateTime, price: f64) {
        match TimeBlock::classify(at) {
            Ok(key) => {
                self.buckets.entry(key).or_default().push(price);
                self.stats.accepted += 1;
            }
            Err(e) => {
                error!(error = %e, at = %at.to_rfc3339(), "block classification failed");
                self.stats.unclassified += 1;
            }
        }
    }

    pub fn stats(&self) -> AggregationStats {
        self.stats
    }

    /// Mean of each non-empty bucket, rounded to 2 decimal places
    pub fn averages(&self) -> BlockAverages {
        let averages: BlockAverages = self
            .buckets
            .iter()
            .filter(|(_, prices)| !prices.is_empty())
            .map(|(key, prices)| {
                let mean = prices.iter().sum::<f64>() / prices.len() as f64;
                (*key, round_to(mean, 2))
            })
            .collect();
        info!(
            blocks = averages.len(),
            accepted = self.stats.accepted,
            skipped = self.stats.skipped,
            "calculated block averages"
        );
        averages
    }
}
