use tracing::{debug, warn};

use crate::domain::{ChargingBlock, LocalDateTime, Price, PricePoint};
use crate::error::ScheduleError;

/// Candidate windows logged at debug level from each end of the search
pub const DEFAULT_SAMPLE_LOG_SIZE: usize = 5;

/// Finds the cheapest run of consecutive slots that ends by a deadline.
///
/// Adjacent positions in the input are treated as contiguous; gaps in the
/// series simply mean fewer windows span real consecutive time.
#[derive(Debug, Clone)]
pub struct CheapestBlockFinder {
    sample_log_size: usize,
}

impl Default for CheapestBlockFinder {
    fn default() -> Self {
        Self {
            sample_log_size: DEFAULT_SAMPLE_LOG_SIZE,
        }
    }
}

impl CheapestBlockFinder {
    pub fn new(sample_log_size: usize) -> Self {
        Self { sample_log_size }
    }

    /// Highest start index whose window still ends at or before `deadline`.
    ///
    /// Window ends grow with the start index in a sorted series, so the scan
    /// stops at the first window that overruns.
    pub fn last_feasible_start(
        slots: &[PricePoint],
        required: usize,
        deadline: &LocalDateTime,
    ) -> Option<usize> {
        if required == 0 || slots.len() < required {
            return None;
        }
        slots
            .windows(required)
            .map(|w| w[required - 1].time_end())
            .take_while(|end| end <= deadline)
            .count()
            .checked_sub(1)
    }

    /// Search a sorted, deduplicated, future-only series.
    ///
    /// Ties keep the earliest window: a later one must be strictly cheaper
    /// to replace the current best.
    pub fn find(
        &self,
        slots: &[PricePoint],
        required: usize,
        deadline: &LocalDateTime,
    ) -> Result<ChargingBlock, ScheduleError> {
        if required == 0 || slots.len() < required {
            warn!(available = slots.len(), required, "not enough price data for required slots");
            return Err(ScheduleError::InsufficientFutureData {
                available: slots.len(),
                required,
            });
        }

        let Some(last_start) = Self::last_feasible_start(slots, required, deadline) else {
            warn!(deadline = %deadline.to_rfc3339(), "no blocks end before ready-by time");
            return Err(ScheduleError::NoValidBlock);
        };

        let search = &slots[..last_start + required];
        let candidates = last_start + 1;
        let mut best: Option<(usize, Price)> = None;

        for (i, window) in search.windows(required).enumerate() {
            let cost: Price = window.iter().map(|p| p.price).sum();

            if i < self.sample_log_size || i + self.sample_log_size >= candidates {
                debug!(
                    block = i + 1,
                    start = %window[0].time_start.to_rfc3339(),
                    cost = cost.as_pounds_per_kwh(),
                    "candidate block"
                );
            }

            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                debug!(index = i, cost = cost.as_pounds_per_kwh(), "new cheapest block found");
                best = Some((i, cost));
            }
        }

        let (index, total) = best.ok_or(ScheduleError::NoValidBlock)?;
        Ok(ChargingBlock::from_window(
            search[index].time_start,
            search[index + required - 1].time_start,
            required,
            total,
        ))
    }
}
