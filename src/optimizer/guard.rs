use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::LocalDateTime;
use crate::host::PublishedState;
use crate::ingest;

/// Default window within which an input edit counts as recent
pub const DEFAULT_RECENT_CHANGE_SECS: i64 = 60;

pub const ATTR_PERIOD_START: &str = "cheapest_period_start";
pub const ATTR_PERIOD_END: &str = "cheapest_period_end";
pub const ATTR_READY_BY: &str = "ready_by_time";
pub const ATTR_SLOTS: &str = "number_of_slots";

/// The schedule published by the previous run, with the inputs it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousSchedule {
    pub start: LocalDateTime,
    pub end: LocalDateTime,
    pub ready_by: Option<LocalDateTime>,
    pub slots: Option<usize>,
}

impl PreviousSchedule {
    /// Read back a published start-time output.
    ///
    /// Returns `None` when the output is marked unavailable or its window
    /// cannot be parsed; either way there is no session to protect.
    pub fn from_published(state: &PublishedState, tz: &Tz) -> Option<Self> {
        if state.state.is_unavailable() {
            return None;
        }
        let start = state
            .attribute(ATTR_PERIOD_START)
            .and_then(|v| time_attribute(v, tz))
            .or_else(|| {
                state
                    .state
                    .as_text()
                    .and_then(|s| ingest::parse_timestamp(s, tz).ok())
            })?;
        let end = state
            .attribute(ATTR_PERIOD_END)
            .and_then(|v| time_attribute(v, tz))?;
        let ready_by = state
            .attribute(ATTR_READY_BY)
            .and_then(|v| time_attribute(v, tz));
        let slots = state
            .attribute(ATTR_SLOTS)
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        Some(Self {
            start,
            end,
            ready_by,
            slots,
        })
    }

    pub fn is_active(&self, now: &LocalDateTime) -> bool {
        *now >= self.start && *now < self.end
    }
}

fn time_attribute(value: &Value, tz: &Tz) -> Option<LocalDateTime> {
    value
        .as_str()
        .and_then(|s| ingest::parse_timestamp(s, tz).ok())
}

/// Current values of the two schedule inputs and when each was last edited.
///
/// A value of `None` means the setting is absent or unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentInputs {
    pub ready_by: Option<LocalDateTime>,
    pub ready_by_changed_at: Option<DateTime<Utc>>,
    pub slots: Option<usize>,
    pub slots_changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// No previous schedule covers `now`
    NoActiveSession,
    /// A session is running and nothing relevant changed
    KeepExisting,
    /// A session is running but an input was just edited
    Recompute,
}

impl GuardDecision {
    pub fn should_recompute(&self) -> bool {
        !matches!(self, Self::KeepExisting)
    }
}

/// Keeps a live charging session stable across periodic runs.
#[derive(Debug, Clone)]
pub struct ScheduleSessionGuard {
    recent_change_window: Duration,
}

impl Default for ScheduleSessionGuard {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_RECENT_CHANGE_SECS))
    }
}

impl ScheduleSessionGuard {
    pub fn new(recent_change_window: Duration) -> Self {
        Self {
            recent_change_window,
        }
    }

    pub fn recent_change_window(&self) -> Duration {
        self.recent_change_window
    }

    fn is_recent(&self, changed_at: Option<DateTime<Utc>>, now: &LocalDateTime) -> bool {
        let Some(changed_at) = changed_at else {
            return false;
        };
        match now.with_timezone(&Utc).checked_sub_signed(self.recent_change_window) {
            Some(cutoff) => changed_at > cutoff,
            // window reaches past the earliest representable instant
            None => true,
        }
    }

    /// Decide whether the finder should run again.
    ///
    /// Inside an active session only an input that differs from the one the
    /// session was built with, and was edited within the window, forces a
    /// recompute.
    pub fn evaluate(
        &self,
        previous: Option<&PreviousSchedule>,
        current: &CurrentInputs,
        now: &LocalDateTime,
    ) -> GuardDecision {
        let Some(previous) = previous.filter(|p| p.is_active(now)) else {
            return GuardDecision::NoActiveSession;
        };

        let ready_by_edited = current.ready_by != previous.ready_by
            && self.is_recent(current.ready_by_changed_at, now);
        let slots_edited =
            current.slots != previous.slots && self.is_recent(current.slots_changed_at, now);

        if ready_by_edited || slots_edited {
            info!(ready_by_edited, slots_edited, "inputs changed during active session, recomputing");
            GuardDecision::Recompute
        } else {
            debug!(
                start = %previous.start.to_rfc3339(),
                end = %previous.end.to_rfc3339(),
                "charging session active, keeping existing schedule"
            );
            GuardDecision::KeepExisting
        }
    }
}
