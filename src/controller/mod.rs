pub mod charging;
pub mod forecast;
pub mod outputs;
pub mod scheduler;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::host::JsonFileHost;

pub use charging::{ChargingController, ChargingOutcome};
pub use forecast::{ForecastController, ForecastOutcome};
pub use scheduler::{PlannerTask, TaskScheduler, TaskStatus};

/// Both run orchestrators, configured from one [`Config`]
#[derive(Debug, Clone)]
pub struct Planner {
    pub forecast: ForecastController,
    pub charging: ChargingController,
}

impl Planner {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            forecast: ForecastController::new(cfg.forecast.clone()),
            charging: ChargingController::new(cfg.charging.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub planner: Planner,
    pub host: Arc<Mutex<JsonFileHost>>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        let tz = cfg.host.timezone()?;
        let host = JsonFileHost::open(&cfg.host.state_file, tz).with_context(|| {
            format!("opening state document {}", cfg.host.state_file.display())
        })?;
        info!(timezone = %tz, "planner state initialised");
        Ok(Self {
            planner: Planner::from_config(&cfg),
            host: Arc::new(Mutex::new(host)),
            cfg,
        })
    }
}

/// Start the periodic forecast and charging tasks
pub fn spawn_planner_tasks(state: AppState) -> Arc<TaskScheduler> {
    let scheduler = Arc::new(TaskScheduler::new(
        state.cfg.scheduler.clone(),
        state.planner,
        state.host,
    ));
    scheduler.clone().start();
    scheduler
}
