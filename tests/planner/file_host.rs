use agile_charge_planner::config::Config;
use agile_charge_planner::controller::{Planner, PlannerTask, TaskScheduler};
use agile_charge_planner::host::{HostState, JsonFileHost};
use chrono::{Duration, DurationRound, Utc};
use chrono_tz::Europe::London;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::{prediction_feed, rate_feed};

fn scheduler(path: &Path) -> TaskScheduler {
    let cfg = Config::default();
    let host = JsonFileHost::open(path, London).unwrap();
    TaskScheduler::new(
        cfg.scheduler.clone(),
        Planner::from_config(&cfg),
        Arc::new(Mutex::new(host)),
    )
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn bridge_written_document_drives_both_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let cfg = Config::default();

    let hour = Utc::now()
        .duration_trunc(Duration::hours(1))
        .unwrap()
        .with_timezone(&London);
    let yesterday = hour - Duration::hours(24);
    let mut prices = vec![0.25; 24];
    prices[5] = 0.02;
    let edited = Utc::now() - Duration::hours(1);

    let document = json!({
        "feeds": {
            (cfg.forecast.source_entity.clone()): prediction_feed(yesterday, 9),
            (cfg.charging.current_rates_entity.clone()): rate_feed(hour, &prices),
        },
        "settings": {
            (cfg.charging.ready_by_entity.clone()): {
                "value": (hour + Duration::hours(10)).to_rfc3339(),
                "last_changed": edited,
            },
            (cfg.charging.hours_entity.clone()): {
                "value": "0.5",
                "last_changed": edited,
            },
        },
    });
    fs::write(&path, document.to_string()).unwrap();

    let scheduler = scheduler(&path);

    let status = scheduler.run_once(PlannerTask::ChargingSchedule);
    assert_eq!(status.success_count, 1, "{:?}", status.last_error);
    let status = scheduler.run_once(PlannerTask::ForecastRefresh);
    assert_eq!(status.success_count, 1, "{:?}", status.last_error);

    let stored = read(&path);
    let start = &stored["outputs"][cfg.charging.start_time_output.as_str()];
    assert_eq!(
        start["state"],
        json!((hour + Duration::minutes(150)).to_rfc3339())
    );
    assert_eq!(start["attributes"]["cheapest_period_total_cost"], json!(0.02));
    assert_eq!(
        stored["outputs"]["sensor.agile_forecast_24_48h"]["attributes"]["all_blocks_present"],
        json!(true)
    );

    // feeds and settings written by the bridge survive our writes
    let reopened = JsonFileHost::open(&path, London).unwrap();
    assert!(reopened
        .price_feed(&cfg.charging.current_rates_entity)
        .unwrap()
        .is_some());
}

#[test]
fn missing_document_reports_unavailable_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let scheduler = scheduler(&path);

    let status = scheduler.run_once(PlannerTask::ForecastRefresh);
    assert_eq!(status.error_count, 1);
    assert_eq!(status.last_error.as_deref(), Some("Source entity not found"));

    let stored = read(&path);
    assert_eq!(
        stored["outputs"]["sensor.agile_forecast_96_120h"]["state"],
        json!("unavailable")
    );
}
