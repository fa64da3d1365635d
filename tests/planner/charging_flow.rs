use agile_charge_planner::config::ChargingConfig;
use agile_charge_planner::controller::{ChargingController, ChargingOutcome};
use agile_charge_planner::domain::LocalDateTime;
use agile_charge_planner::error::ScheduleError;
use agile_charge_planner::host::{InMemoryHost, ScalarSetting};
use chrono::{Duration, Utc};
use serde_json::json;

use super::{local, prediction_feed, rate_feed};

fn config() -> ChargingConfig {
    ChargingConfig::default()
}

fn overnight_rates() -> Vec<f64> {
    // 22:00 to 08:00, cheap from 01:00 to 03:00
    (0..20)
        .map(|i| if (6..10).contains(&i) { 0.05 } else { 0.30 })
        .collect()
}

fn changed_at(now: LocalDateTime, ago: Duration) -> chrono::DateTime<Utc> {
    now.with_timezone(&Utc) - ago
}

/// Host at 22:00 with overnight rates, a 07:00 deadline and two hours required
fn overnight_host() -> InMemoryHost {
    let cfg = config();
    let now = local(15, 22, 0);
    let edited = changed_at(now, Duration::hours(3));
    InMemoryHost::new(now)
        .with_feed(cfg.current_rates_entity, rate_feed(now, &overnight_rates()))
        .with_setting(
            cfg.ready_by_entity,
            ScalarSetting::new("2024-01-16 07:00:00", edited),
        )
        .with_setting(cfg.hours_entity, ScalarSetting::new("2", edited))
}

fn published(outcome: ChargingOutcome) -> agile_charge_planner::domain::ChargingBlock {
    match outcome {
        ChargingOutcome::Published(block) => block,
        other => panic!("expected a published schedule, got {other:?}"),
    }
}

#[test]
fn overnight_schedule_is_published() {
    let mut host = overnight_host();
    let block = published(ChargingController::new(config()).run(&mut host));

    assert_eq!(block.start, local(16, 1, 0));
    assert_eq!(block.end, local(16, 3, 0));
    assert_eq!(block.slot_count, 4);
    assert_eq!(block.total_cost, 0.2);
    assert_eq!(block.average_cost, 0.05);

    let cfg = config();
    assert_eq!(
        host.publish_log,
        vec![
            cfg.start_time_output.clone(),
            cfg.end_time_output.clone(),
            cfg.cost_output.clone(),
            cfg.cheapest_period_output.clone(),
        ]
    );
    let end = host.output(&cfg.end_time_output).unwrap();
    assert_eq!(end.state.as_text(), Some("2024-01-16T03:00:00+00:00"));
    assert_eq!(
        end.attribute("ready_by_time"),
        Some(&json!("2024-01-16T07:00:00+00:00"))
    );
    assert_eq!(end.attribute("calculated_at"), Some(&json!("2024-01-15T22:00:00+00:00")));
    assert_eq!(end.attribute("unit_of_measurement"), Some(&json!("£/kWh")));
    assert_eq!(
        host.output(&cfg.cheapest_period_output).unwrap().state.as_text(),
        Some("off")
    );
}

#[test]
fn active_session_with_unchanged_inputs_publishes_nothing() {
    let controller = ChargingController::new(config());
    let mut host = overnight_host();
    published(controller.run(&mut host));

    host.set_now(local(16, 1, 30));
    host.clear_log();
    assert_eq!(controller.run(&mut host), ChargingOutcome::KeptExisting);
    assert!(host.publish_log.is_empty());
}

#[test]
fn recent_deadline_edit_recomputes_during_session() {
    let cfg = config();
    let controller = ChargingController::new(cfg.clone());
    let mut host = overnight_host();
    published(controller.run(&mut host));

    let now = local(16, 1, 30);
    host.set_now(now);
    host.settings.insert(
        cfg.ready_by_entity.clone(),
        ScalarSetting::new("2024-01-16 06:00:00", changed_at(now, Duration::seconds(30))),
    );
    host.clear_log();

    let block = published(controller.run(&mut host));
    assert_eq!(host.publish_log.len(), 4);
    // the 01:00 slot has ended, so the window slides to 01:30
    assert_eq!(block.start, local(16, 1, 30));
    assert_eq!(
        host.output(&cfg.start_time_output)
            .unwrap()
            .attribute("ready_by_time"),
        Some(&json!("2024-01-16T06:00:00+00:00"))
    );
    assert_eq!(
        host.output(&cfg.cheapest_period_output).unwrap().state.as_text(),
        Some("on")
    );
}

#[test]
fn old_deadline_edit_keeps_session() {
    let cfg = config();
    let controller = ChargingController::new(cfg.clone());
    let mut host = overnight_host();
    published(controller.run(&mut host));

    let now = local(16, 1, 30);
    host.set_now(now);
    host.settings.insert(
        cfg.ready_by_entity.clone(),
        ScalarSetting::new("2024-01-16 06:00:00", changed_at(now, Duration::minutes(5))),
    );
    host.clear_log();

    assert_eq!(controller.run(&mut host), ChargingOutcome::KeptExisting);
    assert!(host.publish_log.is_empty());
}

#[test]
fn unavailable_previous_result_does_not_guard() {
    let cfg = config();
    let controller = ChargingController::new(cfg.clone());
    let mut host = overnight_host();
    host.settings.insert(
        cfg.hours_entity.clone(),
        ScalarSetting::new("unavailable", changed_at(local(15, 22, 0), Duration::hours(1))),
    );
    assert_eq!(
        controller.run(&mut host),
        ChargingOutcome::Unavailable {
            reason: ScheduleError::InvalidChargingHours
        }
    );

    host.settings.insert(
        cfg.hours_entity.clone(),
        ScalarSetting::new("2", changed_at(local(15, 22, 0), Duration::hours(1))),
    );
    published(controller.run(&mut host));
}

#[test]
fn predictions_fill_in_beyond_published_rates() {
    let cfg = config();
    let now = local(15, 22, 0);
    let edited = changed_at(now, Duration::hours(3));
    // actual rates only until midnight; predictions (in pence) cover the night
    let mut host = InMemoryHost::new(now)
        .with_feed(cfg.current_rates_entity.clone(), rate_feed(now, &[0.01, 0.01, 0.30, 0.30]))
        .with_feed(cfg.predicted_entity.clone(), prediction_feed(now, 1))
        .with_setting(cfg.ready_by_entity.clone(), ScalarSetting::new("2024-01-16 07:00:00", edited))
        .with_setting(cfg.hours_entity.clone(), ScalarSetting::new("3", edited));

    let block = published(ChargingController::new(cfg).run(&mut host));
    // actual 23:00 and 23:30 rates override the cheap predicted night,
    // so the first all-night window starts at midnight
    assert_eq!(block.slot_count, 6);
    assert_eq!(block.start, local(16, 0, 0));
    assert_eq!(block.total_cost, 0.3);
    assert_eq!(block.average_cost, 0.05);
}

#[test]
fn deadline_too_close_for_any_window() {
    let cfg = config();
    let now = local(15, 22, 0);
    let edited = changed_at(now, Duration::hours(3));
    let mut host = InMemoryHost::new(now)
        .with_feed(cfg.current_rates_entity.clone(), rate_feed(now, &overnight_rates()))
        .with_setting(cfg.ready_by_entity.clone(), ScalarSetting::new("2024-01-15 23:00:00", edited))
        .with_setting(cfg.hours_entity.clone(), ScalarSetting::new("2", edited));

    assert_eq!(
        ChargingController::new(cfg.clone()).run(&mut host),
        ChargingOutcome::Unavailable {
            reason: ScheduleError::NoValidBlock
        }
    );
    let start = host.output(&cfg.start_time_output).unwrap();
    assert!(start.state.is_unavailable());
    assert_eq!(
        start.attribute("friendly_name"),
        Some(&json!("EV Charging Cheapest Start Time (Unavailable)"))
    );
    assert_eq!(
        start.attribute("error_reason"),
        Some(&json!("Could not find valid charging block"))
    );
}
