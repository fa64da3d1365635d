use agile_charge_planner::config::ForecastConfig;
use agile_charge_planner::controller::{ForecastController, ForecastOutcome};
use agile_charge_planner::error::ForecastError;
use agile_charge_planner::host::{InMemoryHost, PriceFeed};
use serde_json::json;

use super::{local, prediction_feed};

const SOURCE: &str = "sensor.agile_predict";

fn controller() -> ForecastController {
    ForecastController::new(ForecastConfig::default())
}

#[test]
fn week_of_predictions_fills_every_period() {
    let mut host =
        InMemoryHost::new(local(15, 10, 0)).with_feed(SOURCE, prediction_feed(local(15, 0, 0), 7));

    assert_eq!(
        controller().run(&mut host),
        ForecastOutcome::Published { complete: 5 }
    );

    let first = host.output("sensor.agile_forecast_24_48h").unwrap();
    assert_eq!(first.state.as_number(), Some(18.0));
    assert_eq!(first.attribute("peak_price"), Some(&json!(35.0)));
    assert_eq!(first.attribute("evening_price"), Some(&json!(25.0)));
    assert_eq!(first.attribute("nighttime_price"), Some(&json!(5.0)));
    assert_eq!(first.attribute("morning_price"), Some(&json!(10.0)));
    assert_eq!(first.attribute("afternoon_price"), Some(&json!(15.0)));
    assert_eq!(
        first.attribute("forecast_period_start"),
        Some(&json!("2024-01-16T16:00:00+00:00"))
    );
    assert_eq!(
        first.attribute("forecast_period_end"),
        Some(&json!("2024-01-17T16:00:00+00:00"))
    );
    assert_eq!(
        first.attribute("friendly_name"),
        Some(&json!("Agile Forecast 24-48 Hours"))
    );
    assert_eq!(first.attribute("source_entity"), Some(&json!(SOURCE)));
    assert_eq!(first.attribute("all_blocks_present"), Some(&json!(true)));

    let last = host.output("sensor.agile_forecast_120_144h").unwrap();
    assert_eq!(
        last.attribute("forecast_period_start"),
        Some(&json!("2024-01-20T16:00:00+00:00"))
    );
}

#[test]
fn short_feed_leaves_late_periods_incomplete() {
    // data ends on the 18th, so periods reaching the 19th lose blocks
    let mut host =
        InMemoryHost::new(local(15, 10, 0)).with_feed(SOURCE, prediction_feed(local(15, 0, 0), 4));

    assert_eq!(
        controller().run(&mut host),
        ForecastOutcome::Published { complete: 2 }
    );

    let third = host.output("sensor.agile_forecast_72_96h").unwrap();
    assert!(third.state.is_unavailable());
    assert_eq!(third.attribute("overall_average"), Some(&json!("N/A")));
    assert_eq!(third.attribute("morning_price"), Some(&json!(null)));
    assert_eq!(third.attribute("peak_price"), Some(&json!(35.0)));
}

#[test]
fn run_after_peak_moves_anchor_forward() {
    let mut before = InMemoryHost::new(local(15, 15, 30))
        .with_feed(SOURCE, prediction_feed(local(15, 0, 0), 8));
    let mut after = InMemoryHost::new(local(15, 16, 30))
        .with_feed(SOURCE, prediction_feed(local(15, 0, 0), 8));

    controller().run(&mut before);
    controller().run(&mut after);

    let start = |host: &InMemoryHost| {
        host.output("sensor.agile_forecast_24_48h")
            .and_then(|s| s.attribute("forecast_period_start").cloned())
    };
    assert_eq!(start(&before), Some(json!("2024-01-16T16:00:00+00:00")));
    assert_eq!(start(&after), Some(json!("2024-01-17T16:00:00+00:00")));
}

#[test]
fn stale_feed_marks_everything_unavailable() {
    let mut host =
        InMemoryHost::new(local(25, 10, 0)).with_feed(SOURCE, prediction_feed(local(15, 0, 0), 3));

    assert_eq!(
        controller().run(&mut host),
        ForecastOutcome::Unavailable {
            reason: ForecastError::NoFutureAnchor
        }
    );
    assert_eq!(host.publish_log.len(), 5);
    for id in controller().output_ids() {
        let state = host.output(&id).unwrap();
        assert!(state.state.is_unavailable());
        assert_eq!(
            state.attribute("reason"),
            Some(&json!("No future forecast periods available"))
        );
    }
}

#[test]
fn malformed_entries_do_not_block_the_run() {
    let mut feed = prediction_feed(local(15, 0, 0), 7);
    feed.records.push(json!({"date_time": "yesterday", "agile_pred": 99}));
    feed.records.push(json!({"date_time": "2024-01-16T17:00:00Z", "agile_pred": "lots"}));
    feed.records.push(json!({"agile_pred": 1000}));
    let mut host = InMemoryHost::new(local(15, 10, 0)).with_feed(SOURCE, feed);

    assert_eq!(
        controller().run(&mut host),
        ForecastOutcome::Published { complete: 5 }
    );
    let first = host.output("sensor.agile_forecast_24_48h").unwrap();
    assert_eq!(first.attribute("peak_price"), Some(&json!(35.0)));
}

#[test]
fn empty_feed_is_invalid_data() {
    let mut host = InMemoryHost::new(local(15, 10, 0)).with_feed(SOURCE, PriceFeed::default());
    assert_eq!(
        controller().run(&mut host),
        ForecastOutcome::Unavailable {
            reason: ForecastError::InvalidPriceData
        }
    );
}
