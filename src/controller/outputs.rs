//! Published output records.
//!
//! Each output is a state value plus a flat attribute map; the structs here
//! fix the attribute names and serialize into that map.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::{period_hours, ChargingBlock, ForecastPeriod, LocalDateTime};
use crate::error::HostError;
use crate::host::{PublishedState, StateValue};

pub const FORECAST_ICON: &str = "mdi:currency-gbp";
pub const START_ICON: &str = "mdi:clock-start";
pub const END_ICON: &str = "mdi:clock-end";
pub const COST_ICON: &str = "mdi:currency-gbp";
pub const ACTIVE_ICON: &str = "mdi:ev-station";
pub const INACTIVE_ICON: &str = "mdi:power-off";

const NOT_AVAILABLE: &str = "N/A";

fn to_map<T: Serialize>(value: &T) -> Result<Map<String, Value>, HostError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

pub fn forecast_output_id(prefix: &str, offset: usize) -> String {
    let (from, to) = period_hours(offset);
    format!("{prefix}_{from}_{to}h")
}

pub fn forecast_friendly_name(offset: usize) -> String {
    let (from, to) = period_hours(offset);
    format!("Agile Forecast {from}-{to} Hours")
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastAttributes {
    #[serde(flatten)]
    pub block_prices: BTreeMap<&'static str, Option<f64>>,
    pub forecast_period_start: String,
    pub forecast_period_end: String,
    pub unit_of_measurement: String,
    pub icon: &'static str,
    pub friendly_name: String,
    pub all_blocks_present: bool,
    pub source_entity: String,
    pub overall_average: Value,
}

impl ForecastAttributes {
    pub fn new(period: &ForecastPeriod, unit: &str, source_entity: &str) -> Self {
        Self {
            block_prices: period
                .block_prices
                .iter()
                .map(|(block, price)| (block.attribute_name(), *price))
                .collect(),
            forecast_period_start: period.start.to_rfc3339(),
            forecast_period_end: period.end.to_rfc3339(),
            unit_of_measurement: unit.to_string(),
            icon: FORECAST_ICON,
            friendly_name: forecast_friendly_name(period.offset),
            all_blocks_present: period.all_blocks_present(),
            source_entity: source_entity.to_string(),
            overall_average: period
                .overall_average
                .map_or_else(|| Value::from(NOT_AVAILABLE), Value::from),
        }
    }
}

/// The forecast output for one period; the state is the overall average or
/// unavailable when any block is missing.
pub fn forecast_state(
    period: &ForecastPeriod,
    unit: &str,
    source_entity: &str,
) -> Result<PublishedState, HostError> {
    let state = period
        .overall_average
        .map_or(StateValue::Unavailable, StateValue::Number);
    let attributes = to_map(&ForecastAttributes::new(period, unit, source_entity))?;
    Ok(PublishedState::new(state, attributes))
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastUnavailableAttributes {
    pub friendly_name: String,
    pub icon: &'static str,
    pub source_entity: String,
    pub reason: String,
}

pub fn forecast_unavailable_state(
    offset: usize,
    source_entity: &str,
    reason: &str,
) -> Result<PublishedState, HostError> {
    let attributes = to_map(&ForecastUnavailableAttributes {
        friendly_name: forecast_friendly_name(offset),
        icon: FORECAST_ICON,
        source_entity: source_entity.to_string(),
        reason: reason.to_string(),
    })?;
    Ok(PublishedState::new(StateValue::Unavailable, attributes))
}

/// Attributes shared by every charging output
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleAttributes {
    pub cheapest_period_start: String,
    pub cheapest_period_end: String,
    pub cheapest_period_avg_cost: f64,
    pub cheapest_period_total_cost: f64,
    pub unit_of_measurement: String,
    pub number_of_slots: usize,
    pub ready_by_time: String,
    pub calculated_at: String,
}

impl ScheduleAttributes {
    pub fn new(
        block: &ChargingBlock,
        ready_by: &LocalDateTime,
        now: &LocalDateTime,
        unit: &str,
    ) -> Self {
        Self {
            cheapest_period_start: block.start.to_rfc3339(),
            cheapest_period_end: block.end.to_rfc3339(),
            cheapest_period_avg_cost: block.average_cost,
            cheapest_period_total_cost: block.total_cost,
            unit_of_measurement: unit.to_string(),
            number_of_slots: block.slot_count,
            ready_by_time: ready_by.to_rfc3339(),
            calculated_at: now.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct Labelled<'a, T: Serialize> {
    friendly_name: &'a str,
    icon: &'a str,
    #[serde(flatten)]
    inner: &'a T,
}

/// Unavailable-path attributes
#[derive(Debug, Clone, Serialize)]
pub struct ErrorAttributes {
    pub error_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

/// The four charging outputs in publish order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingOutput {
    StartTime,
    EndTime,
    Cost,
    CheapestPeriod,
}

impl ChargingOutput {
    pub const ALL: [ChargingOutput; 4] = [
        Self::StartTime,
        Self::EndTime,
        Self::Cost,
        Self::CheapestPeriod,
    ];

    pub fn friendly_name(&self) -> &'static str {
        match self {
            Self::StartTime => "EV Charging Cheapest Start Time",
            Self::EndTime => "EV Charging Cheapest End Time",
            Self::Cost => "EV Charging Cheapest Block Avg Cost",
            Self::CheapestPeriod => "EV Charging Is Cheapest Period",
        }
    }

    fn unavailable_name(&self) -> &'static str {
        match self {
            Self::StartTime => "EV Charging Cheapest Start Time (Unavailable)",
            Self::EndTime => "EV Charging Cheapest End Time (Unavailable)",
            Self::Cost => "EV Charging Cheapest Block Avg Cost (Unavailable)",
            Self::CheapestPeriod => "EV Charging Is Cheapest Period (Unavailable)",
        }
    }

    fn icon(&self, active: bool) -> &'static str {
        match self {
            Self::StartTime => START_ICON,
            Self::EndTime => END_ICON,
            Self::Cost => COST_ICON,
            Self::CheapestPeriod if active => ACTIVE_ICON,
            Self::CheapestPeriod => INACTIVE_ICON,
        }
    }

    /// Published state for a computed schedule
    pub fn scheduled(
        &self,
        block: &ChargingBlock,
        shared: &ScheduleAttributes,
        now: &LocalDateTime,
    ) -> Result<PublishedState, HostError> {
        let active = block.is_active(now);
        let state = match self {
            Self::StartTime => StateValue::Text(block.start.to_rfc3339()),
            Self::EndTime => StateValue::Text(block.end.to_rfc3339()),
            Self::Cost => StateValue::Number(block.average_cost),
            Self::CheapestPeriod => StateValue::Text(on_off(active).to_string()),
        };
        let attributes = to_map(&Labelled {
            friendly_name: self.friendly_name(),
            icon: self.icon(active),
            inner: shared,
        })?;
        Ok(PublishedState::new(state, attributes))
    }

    /// Published state when no schedule could be computed.
    ///
    /// The indicator is switched off rather than marked unavailable.
    /// `now` is absent only when the clock itself failed.
    pub fn unavailable(
        &self,
        reason: &str,
        now: Option<&LocalDateTime>,
        unit: &str,
    ) -> Result<PublishedState, HostError> {
        let errors = ErrorAttributes {
            error_reason: reason.to_string(),
            calculated_at: now.map(|n| n.to_rfc3339()),
            unit_of_measurement: matches!(self, Self::Cost).then(|| unit.to_string()),
        };
        let state = match self {
            Self::CheapestPeriod => StateValue::Text(on_off(false).to_string()),
            _ => StateValue::Unavailable,
        };
        let attributes = to_map(&Labelled {
            friendly_name: self.unavailable_name(),
            icon: self.icon(false),
            inner: &errors,
        })?;
        Ok(PublishedState::new(state, attributes))
    }
}

fn on_off(active: bool) -> &'static str {
    if active {
        "on"
    } else {
        "off"
    }
}
