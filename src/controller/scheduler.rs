use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use strum::Display;
use tokio::time::interval;
use tracing::{error, info};

use super::{ChargingOutcome, ForecastOutcome, Planner};
use crate::config::SchedulerConfig;
use crate::host::JsonFileHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlannerTask {
    ForecastRefresh,
    ChargingSchedule,
}

/// Task status tracking
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
}

impl TaskStatus {
    fn record(&mut self, at: DateTime<Utc>, result: &Result<()>) {
        self.last_run = Some(at);
        self.run_count += 1;
        match result {
            Ok(()) => {
                self.last_success = Some(at);
                self.success_count += 1;
                self.last_error = None;
            }
            Err(e) => {
                self.error_count += 1;
                self.last_error = Some(e.to_string());
            }
        }
    }
}

/// Drives both planner runs against the shared file-backed host.
///
/// Runs never overlap: each one holds the host lock for its whole duration
/// and flushes its outputs in a single save at the end.
pub struct TaskScheduler {
    config: SchedulerConfig,
    planner: Planner,
    host: Arc<Mutex<JsonFileHost>>,
    forecast_status: Mutex<TaskStatus>,
    charging_status: Mutex<TaskStatus>,
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig, planner: Planner, host: Arc<Mutex<JsonFileHost>>) -> Self {
        Self {
            config,
            planner,
            host,
            forecast_status: Mutex::new(TaskStatus::default()),
            charging_status: Mutex::new(TaskStatus::default()),
        }
    }

    /// Start all periodic tasks
    pub fn start(self: Arc<Self>) {
        for (task, period) in [
            (PlannerTask::ForecastRefresh, self.config.forecast_interval()),
            (PlannerTask::ChargingSchedule, self.config.charging_interval()),
        ] {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    ticker.tick().await;
                    let runner = scheduler.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || runner.run_once(task)).await {
                        error!(%task, error = %e, "planner task panicked");
                    }
                }
            });
            info!(%task, every_secs = period.as_secs(), "periodic task started");
        }
    }

    /// Run one task now and record the result in its status
    pub fn run_once(&self, task: PlannerTask) -> TaskStatus {
        let started = Utc::now();
        let result = self.execute(task);
        if let Err(e) = &result {
            error!(%task, error = %e, "planner task failed");
        }
        let mut status = self.status_slot(task).lock();
        status.record(started, &result);
        status.clone()
    }

    fn execute(&self, task: PlannerTask) -> Result<()> {
        let mut host = self.host.lock();
        host.reload()?;
        let outcome = match task {
            PlannerTask::ForecastRefresh => match self.planner.forecast.run(&mut *host) {
                ForecastOutcome::Published { complete } => {
                    info!(complete, "forecast refresh completed");
                    Ok(())
                }
                ForecastOutcome::Unavailable { reason } => Err(anyhow!(reason)),
            },
            PlannerTask::ChargingSchedule => match self.planner.charging.run(&mut *host) {
                ChargingOutcome::Published(_) | ChargingOutcome::KeptExisting => Ok(()),
                ChargingOutcome::Unavailable { reason } => Err(anyhow!(reason)),
            },
        };
        host.flush()?;
        outcome
    }

    fn status_slot(&self, task: PlannerTask) -> &Mutex<TaskStatus> {
        match task {
            PlannerTask::ForecastRefresh => &self.forecast_status,
            PlannerTask::ChargingSchedule => &self.charging_status,
        }
    }

    pub fn status(&self, task: PlannerTask) -> TaskStatus {
        self.status_slot(task).lock().clone()
    }
}
