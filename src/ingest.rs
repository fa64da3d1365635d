//! Boundary validation for raw host records.
//!
//! Every raw entry is checked on its own and either accepted or skipped with
//! a [`SkipReason`]; one bad entry never rejects the rest of a feed.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::{LocalDateTime, Price, PricePoint, PriceSource};
use crate::host::ScalarSetting;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Setting states that mean "nothing configured"
const UNSET_STATES: [&str; 3] = ["unknown", "unavailable", ""];

/// Why a raw entry was dropped
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SkipReason {
    #[error("record is not an object")]
    NotAnObject,
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("missing price")]
    MissingPrice,
    #[error("unparsable timestamp: {0}")]
    BadTimestamp(String),
    #[error("non-numeric price: {0}")]
    BadPrice(String),
}

/// One raw feed entry.
///
/// Forecast feeds use `date_time`/`agile_pred`, tariff feeds use
/// `start`/`value_inc_vat`; both map onto the same two fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default, alias = "date_time", alias = "start")]
    pub timestamp: Option<Value>,
    #[serde(default, alias = "agile_pred", alias = "value_inc_vat")]
    pub price: Option<Value>,
}

impl RawPriceRecord {
    pub fn from_value(value: &Value) -> Result<Self, SkipReason> {
        if !value.is_object() {
            return Err(SkipReason::NotAnObject);
        }
        Self::deserialize(value).map_err(|_| SkipReason::NotAnObject)
    }

    /// Validate into a local instant and a raw numeric price
    pub fn validate(&self, tz: &Tz) -> Result<(LocalDateTime, f64), SkipReason> {
        let timestamp = match &self.timestamp {
            None | Some(Value::Null) => return Err(SkipReason::MissingTimestamp),
            Some(Value::String(s)) => parse_timestamp(s, tz)?,
            Some(other) => return Err(SkipReason::BadTimestamp(other.to_string())),
        };
        let price = match &self.price {
            None | Some(Value::Null) => return Err(SkipReason::MissingPrice),
            Some(v) => parse_price(v)?,
        };
        Ok((timestamp, price))
    }
}

/// Accepted entries plus a count of skipped ones
#[derive(Debug, Clone)]
pub struct IngestReport<T> {
    pub accepted: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for IngestReport<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            skipped: 0,
        }
    }
}

/// Validate a single raw JSON entry
pub fn parse_entry(value: &Value, tz: &Tz) -> Result<(LocalDateTime, f64), SkipReason> {
    RawPriceRecord::from_value(value)?.validate(tz)
}

/// Validate a whole feed into price points tagged with their source.
///
/// Predicted feeds carry pence and are converted to pounds here.
pub fn price_points(records: &[Value], tz: &Tz, source: PriceSource) -> IngestReport<PricePoint> {
    let mut report = IngestReport::default();
    for record in records {
        match parse_entry(record, tz) {
            Ok((time_start, raw)) => {
                let price = match source {
                    PriceSource::Predicted => Price::pence_per_kwh(raw),
                    PriceSource::CurrentActual | PriceSource::NextActual => {
                        Price::pounds_per_kwh(raw)
                    }
                };
                report.accepted.push(PricePoint::new(time_start, price, source));
            }
            Err(reason) => {
                debug!(%source, %reason, "skipping price entry");
                report.skipped += 1;
            }
        }
    }
    report
}

/// Parse an ISO-8601 timestamp into the local timezone.
///
/// Offset-qualified timestamps are converted; naive ones are taken as local
/// wall-clock time.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Result<LocalDateTime, SkipReason> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(tz));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(tz));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| SkipReason::BadTimestamp(raw.to_string()))
}

/// Accept JSON numbers and numeric strings
pub fn parse_price(value: &Value) -> Result<f64, SkipReason> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|p| p.is_finite())
        .ok_or_else(|| SkipReason::BadPrice(value.to_string()))
}

fn configured_value(setting: Option<&ScalarSetting>) -> Option<&str> {
    let value = setting?.value.as_deref()?.trim();
    (!UNSET_STATES.contains(&value)).then_some(value)
}

/// The ready-by deadline, if configured and parsable
pub fn parse_ready_by(setting: Option<&ScalarSetting>, tz: &Tz) -> Option<LocalDateTime> {
    let raw = configured_value(setting)?;
    parse_timestamp(raw, tz).ok()
}

/// Required half-hour slots from a decimal hours setting.
///
/// Fractional slots are truncated; zero or negative results are rejected.
pub fn parse_required_slots(setting: Option<&ScalarSetting>) -> Option<usize> {
    let hours: f64 = configured_value(setting)?.parse().ok()?;
    if !hours.is_finite() {
        return None;
    }
    let slots = (hours * 2.0).trunc();
    (slots >= 1.0).then_some(slots as usize)
}
