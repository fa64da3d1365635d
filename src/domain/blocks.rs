use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::LocalDateTime;
use crate::error::ClassificationError;

/// Named daily tariff period.
///
/// The five blocks partition the clock: Nighttime runs 23:00-06:00 across
/// midnight, the others are same-day half-open intervals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum TimeBlock {
    Nighttime,
    Morning,
    Afternoon,
    Peak,
    Evening,
}

// Block boundaries fall on the hour
const NIGHT_START: u32 = 23;
const MORNING_START: u32 = 6;
const AFTERNOON_START: u32 = 12;
const PEAK_START: u32 = 16;
const EVENING_START: u32 = 20;

fn clock(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
}

impl TimeBlock {
    /// Inclusive clock time at which the block begins.
    pub fn start_time(&self) -> NaiveTime {
        clock(match self {
            Self::Nighttime => NIGHT_START,
            Self::Morning => MORNING_START,
            Self::Afternoon => AFTERNOON_START,
            Self::Peak => PEAK_START,
            Self::Evening => EVENING_START,
        })
    }

    /// Exclusive clock time at which the block ends.
    pub fn end_time(&self) -> NaiveTime {
        clock(match self {
            Self::Nighttime => MORNING_START,
            Self::Morning => AFTERNOON_START,
            Self::Afternoon => PEAK_START,
            Self::Peak => EVENING_START,
            Self::Evening => NIGHT_START,
        })
    }

    /// Attribute key used when publishing this block's price
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Self::Nighttime => "nighttime_price",
            Self::Morning => "morning_price",
            Self::Afternoon => "afternoon_price",
            Self::Peak => "peak_price",
            Self::Evening => "evening_price",
        }
    }

    /// Classify a local instant into its block and effective date.
    ///
    /// Times from midnight to 06:00 belong to the Nighttime block that began
    /// at 23:00 the previous day.
    pub fn classify(at: &LocalDateTime) -> Result<BlockKey, ClassificationError> {
        let h = at.hour();
        let d = at.date_naive();

        let (block, date) = if h >= NIGHT_START {
            (Self::Nighttime, d)
        } else if h < MORNING_START {
            let previous = d
                .checked_sub_days(Days::new(1))
                .ok_or(ClassificationError::DateOutOfRange(d))?;
            (Self::Nighttime, previous)
        } else if h >= EVENING_START {
            (Self::Evening, d)
        } else if h >= PEAK_START {
            (Self::Peak, d)
        } else if h >= AFTERNOON_START {
            (Self::Afternoon, d)
        } else if h >= MORNING_START {
            (Self::Morning, d)
        } else {
            return Err(ClassificationError::Unmatched(at.time()));
        };

        Ok(BlockKey::new(date, block))
    }
}

/// A block on the calendar date it is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    pub date: NaiveDate,
    pub block: TimeBlock,
}

impl BlockKey {
    pub fn new(date: NaiveDate, block: TimeBlock) -> Self {
        Self { date, block }
    }
}

impl std::fmt::Display for BlockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date, self.block)
    }
}
