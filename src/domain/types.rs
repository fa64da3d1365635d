use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div};
use strum::{Display, EnumString};

// ============================================================================
// Time Helper Types
// ============================================================================

/// Instant expressed in the household's local timezone.
pub type LocalDateTime = DateTime<Tz>;

/// Length of one tariff slot in minutes
pub const SLOT_MINUTES: i64 = 30;

/// Nominal duration of a single pricing slot
pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Round half away from zero to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Price Types
// ============================================================================

/// Price in pounds per kilowatt-hour (£/kWh)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Price(pub f64);

impl Price {
    pub fn pounds_per_kwh(price: f64) -> Self {
        Self(price)
    }

    /// Predicted feeds publish pence; everything else works in pounds.
    pub fn pence_per_kwh(price: f64) -> Self {
        Self(price / 100.0)
    }

    pub fn as_pounds_per_kwh(&self) -> f64 {
        self.0
    }

    pub fn as_pence_per_kwh(&self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} £/kWh", self.0)
    }
}

impl Add for Price {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Div<f64> for Price {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Where a price point came from. Confirmed tariffs outrank predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PriceSource {
    CurrentActual,
    NextActual,
    Predicted,
}

impl PriceSource {
    /// Merge priority; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::CurrentActual | Self::NextActual => 0,
            Self::Predicted => 1,
        }
    }

    pub fn is_actual(&self) -> bool {
        self.priority() == 0
    }
}

/// A single half-hour tariff slot
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub time_start: LocalDateTime,
    pub price: Price,
    pub source: PriceSource,
}

impl PricePoint {
    pub fn new(time_start: LocalDateTime, price: Price, source: PriceSource) -> Self {
        Self {
            time_start,
            price,
            source,
        }
    }

    pub fn time_end(&self) -> LocalDateTime {
        self.time_start + slot_duration()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
