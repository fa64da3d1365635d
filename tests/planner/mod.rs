mod charging_flow;
mod file_host;
mod forecast_flow;

use agile_charge_planner::domain::{LocalDateTime, TimeBlock};
use agile_charge_planner::host::PriceFeed;
use chrono::{Duration, TimeZone};
use chrono_tz::Europe::London;
use serde_json::json;

pub fn local(d: u32, h: u32, m: u32) -> LocalDateTime {
    London.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
}

/// Block price in pence used by the forecast fixtures
pub fn block_price(block: TimeBlock) -> f64 {
    match block {
        TimeBlock::Nighttime => 5.0,
        TimeBlock::Morning => 10.0,
        TimeBlock::Afternoon => 15.0,
        TimeBlock::Peak => 35.0,
        TimeBlock::Evening => 25.0,
    }
}

/// Half-hourly predictions starting at `from` for `days` days
pub fn prediction_feed(from: LocalDateTime, days: i64) -> PriceFeed {
    let records = (0..days * 48)
        .map(|slot| {
            let at = from + Duration::minutes(30 * slot);
            let block = TimeBlock::classify(&at).unwrap().block;
            json!({"date_time": at.to_rfc3339(), "agile_pred": block_price(block)})
        })
        .collect();
    PriceFeed {
        records,
        unit_of_measurement: None,
    }
}

/// Tariff rates in pounds starting at `from`
pub fn rate_feed(from: LocalDateTime, prices: &[f64]) -> PriceFeed {
    let records = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let start = from + Duration::minutes(30 * i as i64);
            let end = start + Duration::minutes(30);
            json!({
                "start": start.to_rfc3339(),
                "end": end.to_rfc3339(),
                "value_inc_vat": price,
            })
        })
        .collect();
    PriceFeed {
        records,
        unit_of_measurement: None,
    }
}
