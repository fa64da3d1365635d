use chrono::{Days, NaiveDate, NaiveTime, TimeZone};
use tracing::{debug, info, warn};

use super::BlockAverages;
use crate::domain::{
    round_to, BlockKey, ForecastPeriod, LocalDateTime, TimeBlock, FORECAST_PERIODS, PERIOD_BLOCKS,
};
use crate::error::ForecastError;

/// Builds the five rolling 24-hour forecast periods from block averages.
///
/// Periods run from the Peak start (16:00) of one day to 16:00 the next.
/// The anchor is the first date whose 16:00 has Peak data and is not in
/// the past; period `i` starts `i` days after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingForecastBuilder;

impl RollingForecastBuilder {
    pub fn new() -> Self {
        Self
    }

    fn boundary(&self) -> NaiveTime {
        TimeBlock::Peak.start_time()
    }

    /// `date` at the period boundary in `now`'s timezone
    fn boundary_on(
        &self,
        date: NaiveDate,
        now: &LocalDateTime,
    ) -> Result<LocalDateTime, ForecastError> {
        let naive = date.and_time(self.boundary());
        now.timezone()
            .from_local_datetime(&naive)
            .earliest()
            .ok_or(ForecastError::NonexistentLocalTime(naive))
    }

    /// First date with Peak data whose 16:00 is at or after `now`
    pub fn find_anchor(
        &self,
        averages: &BlockAverages,
        now: &LocalDateTime,
    ) -> Result<NaiveDate, ForecastError> {
        let dates = averages.dates();
        if dates.is_empty() {
            return Err(ForecastError::NoForecastDates);
        }
        for date in dates {
            if !averages.contains(&BlockKey::new(date, TimeBlock::Peak)) {
                continue;
            }
            let boundary = self.boundary_on(date, now)?;
            if boundary >= *now {
                info!(anchor = %boundary.to_rfc3339(), "found first future period boundary");
                return Ok(date);
            }
        }
        warn!("no future 16:00 with Peak data available");
        Err(ForecastError::NoFutureAnchor)
    }

    /// Assemble all five periods relative to the anchor
    pub fn build(
        &self,
        averages: &BlockAverages,
        now: &LocalDateTime,
    ) -> Result<Vec<ForecastPeriod>, ForecastError> {
        let anchor = self.find_anchor(averages, now)?;
        (1..=FORECAST_PERIODS)
            .map(|offset| self.period(averages, anchor, offset, now))
            .collect()
    }

    fn period(
        &self,
        averages: &BlockAverages,
        anchor: NaiveDate,
        offset: usize,
        now: &LocalDateTime,
    ) -> Result<ForecastPeriod, ForecastError> {
        let start_date = add_days(anchor, offset as u64)?;
        let end_date = add_days(start_date, 1)?;

        let keys = ForecastPeriod::required_keys(start_date, end_date);
        let mut block_prices = PERIOD_BLOCKS.map(|block| (block, None));
        for ((block, price), key) in block_prices.iter_mut().zip(keys.iter()) {
            *price = averages.get(key);
            if price.is_none() {
                warn!(block = %block, date = %key.date, "missing block data");
            }
        }

        let found: Vec<f64> = block_prices.iter().filter_map(|(_, p)| *p).collect();
        let overall_average = (found.len() == keys.len())
            .then(|| round_to(found.iter().sum::<f64>() / found.len() as f64, 2));

        debug!(offset, %start_date, %end_date, ?overall_average, "assembled forecast period");

        Ok(ForecastPeriod {
            offset,
            start_date,
            end_date,
            start: self.boundary_on(start_date, now)?,
            end: self.boundary_on(end_date, now)?,
            block_prices,
            overall_average,
        })
    }
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, ForecastError> {
    date.checked_add_days(Days::new(days))
        .ok_or(ForecastError::NoFutureAnchor)
}
