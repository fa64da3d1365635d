use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Faults raised by the host state collaborator
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Clock unavailable: {0}")]
    Clock(String),

    #[error("State store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State store format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Publish rejected for {entity}: {reason}")]
    PublishRejected { entity: String, reason: String },
}

/// A local clock time that fell through every block rule.
///
/// The block intervals partition the day, so this only surfaces if that
/// partition is broken.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Time {0} did not match any block")]
    Unmatched(NaiveTime),

    #[error("Date {0} has no previous day")]
    DateOutOfRange(NaiveDate),
}

/// Structural failures of the rolling forecast run.
///
/// The display text is published as the unavailable reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("Time retrieval error")]
    ClockUnavailable,

    #[error("Source entity not found")]
    SourceNotFound,

    #[error("Invalid price data")]
    InvalidPriceData,

    #[error("No forecast dates available")]
    NoForecastDates,

    #[error("No future forecast periods available")]
    NoFutureAnchor,

    #[error("Local time {0} does not exist in the configured timezone")]
    NonexistentLocalTime(NaiveDateTime),

    #[error("Error updating sensors: {0}")]
    PublishFailed(String),
}

/// Structural failures of the charging schedule run.
///
/// The display text is published as the `error_reason` attribute.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Time retrieval error")]
    ClockUnavailable,

    #[error("Invalid 'Ready By' time")]
    InvalidReadyBy,

    #[error("'Ready By' time is not in the future")]
    ReadyByNotInFuture,

    #[error("Invalid required charging hours")]
    InvalidChargingHours,

    #[error("No price data available")]
    NoPriceData,

    #[error("Not enough future price data ({available} < {required})")]
    InsufficientFutureData { available: usize, required: usize },

    #[error("Could not find valid charging block")]
    NoValidBlock,

    #[error("Error updating sensors: {0}")]
    PublishFailed(String),
}
