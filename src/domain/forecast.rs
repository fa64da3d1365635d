use chrono::NaiveDate;

use super::{BlockKey, LocalDateTime, TimeBlock};

/// Number of rolling 24-hour periods published ahead of the anchor
pub const FORECAST_PERIODS: usize = 5;

/// The five blocks, in the order a 16:00-to-16:00 period walks through them.
/// The first three fall on the start date, the last two on the following day.
pub const PERIOD_BLOCKS: [TimeBlock; 5] = [
    TimeBlock::Peak,
    TimeBlock::Evening,
    TimeBlock::Nighttime,
    TimeBlock::Morning,
    TimeBlock::Afternoon,
];

/// Hours covered by the period at `offset`, relative to the anchor
pub fn period_hours(offset: usize) -> (usize, usize) {
    (offset * 24, (offset + 1) * 24)
}

/// One rolling 24-hour forecast window.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPeriod {
    /// 1-based offset from the anchor date
    pub offset: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start: LocalDateTime,
    pub end: LocalDateTime,
    /// Block averages in [`PERIOD_BLOCKS`] order; `None` when no data was seen
    pub block_prices: [(TimeBlock, Option<f64>); 5],
    /// Mean of the five block averages, present only when all five exist
    pub overall_average: Option<f64>,
}

impl ForecastPeriod {
    /// Block keys that must all be present for the period to have an average
    pub fn required_keys(start_date: NaiveDate, end_date: NaiveDate) -> [BlockKey; 5] {
        PERIOD_BLOCKS.map(|block| match block {
            TimeBlock::Peak | TimeBlock::Evening | TimeBlock::Nighttime => {
                BlockKey::new(start_date, block)
            }
            TimeBlock::Morning | TimeBlock::Afternoon => BlockKey::new(end_date, block),
        })
    }

    pub fn all_blocks_present(&self) -> bool {
        self.block_prices.iter().all(|(_, price)| price.is_some())
    }

    pub fn price_of(&self, block: TimeBlock) -> Option<f64> {
        self.block_prices
            .iter()
            .find(|(b, _)| *b == block)
            .and_then(|(_, price)| *price)
    }

    /// Hours covered relative to the anchor, e.g. `(24, 48)` for offset 1
    pub fn hour_range(&self) -> (usize, usize) {
        period_hours(self.offset)
    }
}
