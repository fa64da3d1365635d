use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use super::outputs::{ChargingOutput, ScheduleAttributes};
use crate::config::ChargingConfig;
use crate::domain::{ChargingBlock, LocalDateTime, PriceSource};
use crate::error::{HostError, ScheduleError};
use crate::host::{HostState, ScalarSetting};
use crate::ingest;
use crate::optimizer::{
    source_breakdown, CheapestBlockFinder, CurrentInputs, GuardDecision, PreviousSchedule,
    PriceSeriesMerger, ScheduleSessionGuard,
};

/// What a charging run left behind on the host
#[derive(Debug, Clone, PartialEq)]
pub enum ChargingOutcome {
    Published(ChargingBlock),
    /// An active session was left untouched; nothing was published
    KeptExisting,
    /// All charging outputs were marked unavailable
    Unavailable { reason: ScheduleError },
}

/// Settings read once per run and shared by the guard and the search
struct Settings {
    ready_by: Option<ScalarSetting>,
    hours: Option<ScalarSetting>,
}

/// Finds and publishes the cheapest charging window before the ready-by time.
#[derive(Debug, Clone)]
pub struct ChargingController {
    config: ChargingConfig,
    finder: CheapestBlockFinder,
    guard: ScheduleSessionGuard,
}

impl ChargingController {
    pub fn new(config: ChargingConfig) -> Self {
        let guard = ScheduleSessionGuard::new(config.recent_change_window());
        Self {
            config,
            finder: CheapestBlockFinder::default(),
            guard,
        }
    }

    fn output_id(&self, output: ChargingOutput) -> &str {
        match output {
            ChargingOutput::StartTime => &self.config.start_time_output,
            ChargingOutput::EndTime => &self.config.end_time_output,
            ChargingOutput::Cost => &self.config.cost_output,
            ChargingOutput::CheapestPeriod => &self.config.cheapest_period_output,
        }
    }

    pub fn run(&self, host: &mut dyn HostState) -> ChargingOutcome {
        info!("starting charging schedule update");

        let now = match host.current_instant() {
            Ok(now) => now,
            Err(e) => {
                error!(error = %e, "failed to read current time");
                return self.mark_unavailable(host, ScheduleError::ClockUnavailable, None);
            }
        };
        let tz = now.timezone();
        let settings = Settings {
            ready_by: read_setting(&*host, &self.config.ready_by_entity),
            hours: read_setting(&*host, &self.config.hours_entity),
        };

        if self.check_session(&*host, &settings, &now, &tz) == GuardDecision::KeepExisting {
            return ChargingOutcome::KeptExisting;
        }

        let (block, ready_by) = match self.schedule(&*host, &settings, &now, &tz) {
            Ok(result) => result,
            Err(reason) => return self.mark_unavailable(host, reason, Some(&now)),
        };

        match self.publish(host, &block, &ready_by, &now) {
            Ok(()) => {
                info!(
                    start = %block.start.to_rfc3339(),
                    end = %block.end.to_rfc3339(),
                    average_cost = block.average_cost,
                    "charging schedule update completed"
                );
                ChargingOutcome::Published(block)
            }
            Err(e) => {
                error!(error = %e, "error setting charging outputs");
                self.mark_unavailable(host, ScheduleError::PublishFailed(e.to_string()), Some(&now))
            }
        }
    }

    fn check_session(
        &self,
        host: &dyn HostState,
        settings: &Settings,
        now: &LocalDateTime,
        tz: &Tz,
    ) -> GuardDecision {
        let previous = match host.previous_result(&self.config.start_time_output) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "error checking charging session");
                None
            }
        };
        let previous = previous.and_then(|p| PreviousSchedule::from_published(&p, tz));
        let current = CurrentInputs {
            ready_by: ingest::parse_ready_by(settings.ready_by.as_ref(), tz),
            ready_by_changed_at: settings.ready_by.as_ref().and_then(|s| s.last_changed),
            slots: ingest::parse_required_slots(settings.hours.as_ref()),
            slots_changed_at: settings.hours.as_ref().and_then(|s| s.last_changed),
        };
        self.guard.evaluate(previous.as_ref(), &current, now)
    }

    fn schedule(
        &self,
        host: &dyn HostState,
        settings: &Settings,
        now: &LocalDateTime,
        tz: &Tz,
    ) -> Result<(ChargingBlock, LocalDateTime), ScheduleError> {
        let ready_by = ingest::parse_ready_by(settings.ready_by.as_ref(), tz)
            .ok_or(ScheduleError::InvalidReadyBy)?;
        if ready_by <= *now {
            return Err(ScheduleError::ReadyByNotInFuture);
        }
        let required = ingest::parse_required_slots(settings.hours.as_ref())
            .ok_or(ScheduleError::InvalidChargingHours)?;

        let mut merger = PriceSeriesMerger::new();
        for (entity, source) in [
            (&self.config.current_rates_entity, PriceSource::CurrentActual),
            (&self.config.next_rates_entity, PriceSource::NextActual),
            (&self.config.predicted_entity, PriceSource::Predicted),
        ] {
            let feed = match host.price_feed(entity) {
                Ok(Some(feed)) => feed,
                Ok(None) => {
                    debug!(%entity, "price feed not found");
                    continue;
                }
                Err(e) => {
                    warn!(%entity, error = %e, "failed to read price feed");
                    continue;
                }
            };
            let report = ingest::price_points(&feed.records, tz, source);
            debug!(%source, found = report.accepted.len(), skipped = report.skipped, "read price feed");
            merger.extend(report.accepted);
        }
        if merger.received() == 0 {
            return Err(ScheduleError::NoPriceData);
        }

        let future = merger.merged_from(now);
        let (actual, predicted) = source_breakdown(&future);
        info!(future = future.len(), actual, predicted, required, "searching for cheapest block");

        let block = self.finder.find(&future, required, &ready_by)?;
        Ok((block, ready_by))
    }

    fn publish(
        &self,
        host: &mut dyn HostState,
        block: &ChargingBlock,
        ready_by: &LocalDateTime,
        now: &LocalDateTime,
    ) -> Result<(), HostError> {
        let shared = ScheduleAttributes::new(block, ready_by, now, &self.config.unit_of_measurement);
        for output in ChargingOutput::ALL {
            let state = output.scheduled(block, &shared, now)?;
            host.publish(self.output_id(output), state)?;
        }
        Ok(())
    }

    fn mark_unavailable(
        &self,
        host: &mut dyn HostState,
        reason: ScheduleError,
        now: Option<&LocalDateTime>,
    ) -> ChargingOutcome {
        warn!(%reason, "setting charging outputs to unavailable");
        let text = reason.to_string();
        for output in ChargingOutput::ALL {
            let id = self.output_id(output);
            let published = output
                .unavailable(&text, now, &self.config.unit_of_measurement)
                .and_then(|state| host.publish(id, state));
            if let Err(e) = published {
                error!(output = %id, error = %e, "failed to set unavailable state");
            }
        }
        ChargingOutcome::Unavailable { reason }
    }
}

fn read_setting(host: &dyn HostState, id: &str) -> Option<ScalarSetting> {
    host.scalar_setting(id).unwrap_or_else(|e| {
        warn!(setting = %id, error = %e, "failed to read setting");
        None
    })
}
