use agile_charge_planner::{config, controller, telemetry};
use anyhow::Result;
use config::Config;
use controller::PlannerTask;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    info!(
        state_file = %cfg.host.state_file.display(),
        timezone = %cfg.host.timezone,
        "starting agile charge planner"
    );

    let app_state = controller::AppState::new(cfg)?;
    let scheduler = controller::spawn_planner_tasks(app_state);

    telemetry::shutdown_signal().await;

    for task in [PlannerTask::ForecastRefresh, PlannerTask::ChargingSchedule] {
        let status = scheduler.status(task);
        info!(
            %task,
            runs = status.run_count,
            successes = status.success_count,
            failures = status.error_count,
            "task summary"
        );
    }
    warn!("shutdown complete");
    Ok(())
}
