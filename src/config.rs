use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "ACP__";
/// Upper bound for either task interval, one day
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;
/// Upper bound for the recent-edit window, one day
pub const MAX_RECENT_CHANGE_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub scheduler: SchedulerConfig,
    pub forecast: ForecastConfig,
    pub charging: ChargingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub state_file: PathBuf,
    pub timezone: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("state/host_state.json"),
            timezone: "Europe/London".to_string(),
        }
    }
}

impl HostConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub forecast_every_minutes: u64,
    pub charging_every_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            forecast_every_minutes: 30,
            charging_every_minutes: 1,
        }
    }
}

impl SchedulerConfig {
    pub fn forecast_interval(&self) -> Duration {
        minutes(self.forecast_every_minutes)
    }

    pub fn charging_interval(&self) -> Duration {
        minutes(self.charging_every_minutes)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("forecast_every_minutes", self.forecast_every_minutes),
            ("charging_every_minutes", self.charging_every_minutes),
        ] {
            if !(1..=MAX_INTERVAL_MINUTES).contains(&value) {
                bail!("scheduler.{name} must be between 1 and {MAX_INTERVAL_MINUTES}, got {value}");
            }
        }
        Ok(())
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.clamp(1, MAX_INTERVAL_MINUTES) * 60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub source_entity: String,
    /// Used when the feed carries no unit of its own
    pub unit_of_measurement: String,
    pub output_prefix: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            source_entity: "sensor.agile_predict".to_string(),
            unit_of_measurement: "GBP/kWh".to_string(),
            output_prefix: "sensor.agile_forecast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargingConfig {
    pub ready_by_entity: String,
    pub hours_entity: String,
    pub current_rates_entity: String,
    pub next_rates_entity: String,
    pub predicted_entity: String,
    pub start_time_output: String,
    pub end_time_output: String,
    pub cost_output: String,
    pub cheapest_period_output: String,
    pub unit_of_measurement: String,
    pub recent_change_window_secs: i64,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            ready_by_entity: "input_datetime.ev_ready_by".to_string(),
            hours_entity: "input_number.ev_charging_hours".to_string(),
            current_rates_entity: "event.octopus_energy_electricity_current_day_rates".to_string(),
            next_rates_entity: "event.octopus_energy_electricity_next_day_rates".to_string(),
            predicted_entity: "sensor.agile_predict".to_string(),
            start_time_output: "sensor.ev_charging_cheapest_start_time".to_string(),
            end_time_output: "sensor.ev_charging_cheapest_end_time".to_string(),
            cost_output: "sensor.ev_charging_cheapest_cost".to_string(),
            cheapest_period_output: "binary_sensor.ev_charging_is_cheapest_period".to_string(),
            unit_of_measurement: "£/kWh".to_string(),
            recent_change_window_secs: crate::optimizer::DEFAULT_RECENT_CHANGE_SECS,
        }
    }
}

impl ChargingConfig {
    pub fn recent_change_window(&self) -> chrono::Duration {
        let secs = self.recent_change_window_secs.clamp(0, MAX_RECENT_CHANGE_SECS);
        chrono::Duration::try_seconds(secs).unwrap_or_else(chrono::Duration::zero)
    }

    fn validate(&self) -> Result<()> {
        let secs = self.recent_change_window_secs;
        if !(0..=MAX_RECENT_CHANGE_SECS).contains(&secs) {
            bail!("charging.recent_change_window_secs must be between 0 and {MAX_RECENT_CHANGE_SECS}, got {secs}");
        }
        Ok(())
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `ACP__` environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment
            .extract()
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        cfg.host.timezone()?;
        cfg.scheduler.validate()?;
        cfg.charging.validate()?;
        Ok(cfg)
    }
}
