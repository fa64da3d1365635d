use tracing::{error, info, warn};

use super::outputs::{forecast_output_id, forecast_state, forecast_unavailable_state};
use crate::config::ForecastConfig;
use crate::domain::{ForecastPeriod, FORECAST_PERIODS};
use crate::error::ForecastError;
use crate::forecast::{PriceAggregator, RollingForecastBuilder};
use crate::host::HostState;

/// What a forecast run left behind on the host
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    /// All five periods published; `complete` of them had every block
    Published { complete: usize },
    /// Every forecast output was marked unavailable
    Unavailable { reason: ForecastError },
}

/// Publishes the five rolling 24-hour block forecasts.
#[derive(Debug, Clone)]
pub struct ForecastController {
    config: ForecastConfig,
    builder: RollingForecastBuilder,
}

impl ForecastController {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            builder: RollingForecastBuilder::new(),
        }
    }

    pub fn output_ids(&self) -> Vec<String> {
        (1..=FORECAST_PERIODS)
            .map(|offset| forecast_output_id(&self.config.output_prefix, offset))
            .collect()
    }

    pub fn run(&self, host: &mut dyn HostState) -> ForecastOutcome {
        info!(source = %self.config.source_entity, "starting forecast update");

        let (periods, unit) = match self.compute(&*host) {
            Ok(result) => result,
            Err(reason) => return self.mark_unavailable(host, reason),
        };

        let mut complete = 0;
        for period in &periods {
            let id = forecast_output_id(&self.config.output_prefix, period.offset);
            let published = forecast_state(period, &unit, &self.config.source_entity)
                .and_then(|state| host.publish(&id, state));
            if let Err(e) = published {
                error!(output = %id, error = %e, "failed to publish forecast");
                return self.mark_unavailable(host, ForecastError::PublishFailed(e.to_string()));
            }
            if period.all_blocks_present() {
                complete += 1;
            }
            info!(output = %id, average = ?period.overall_average, "updated forecast");
        }

        info!(complete, "forecast update completed");
        ForecastOutcome::Published { complete }
    }

    fn compute(
        &self,
        host: &dyn HostState,
    ) -> Result<(Vec<ForecastPeriod>, String), ForecastError> {
        let now = host.current_instant().map_err(|e| {
            error!(error = %e, "failed to read current time");
            ForecastError::ClockUnavailable
        })?;

        let feed = match host.price_feed(&self.config.source_entity) {
            Ok(Some(feed)) => feed,
            Ok(None) => return Err(ForecastError::SourceNotFound),
            Err(e) => {
                error!(error = %e, "failed to read source feed");
                return Err(ForecastError::SourceNotFound);
            }
        };
        if feed.records.is_empty() {
            return Err(ForecastError::InvalidPriceData);
        }
        info!(points = feed.records.len(), "processing price points");

        let aggregator = PriceAggregator::from_records(&feed.records, &now.timezone());
        let periods = self.builder.build(&aggregator.averages(), &now)?;

        let unit = feed
            .unit_of_measurement
            .unwrap_or_else(|| self.config.unit_of_measurement.clone());
        Ok((periods, unit))
    }

    fn mark_unavailable(&self, host: &mut dyn HostState, reason: ForecastError) -> ForecastOutcome {
        warn!(%reason, "setting forecast outputs to unavailable");
        let text = reason.to_string();
        for offset in 1..=FORECAST_PERIODS {
            let id = forecast_output_id(&self.config.output_prefix, offset);
            let published = forecast_unavailable_state(offset, &self.config.source_entity, &text)
                .and_then(|state| host.publish(&id, state));
            if let Err(e) = published {
                error!(output = %id, error = %e, "failed to mark forecast unavailable");
            }
        }
        ForecastOutcome::Unavailable { reason }
    }
}
