use std::collections::HashMap;

use super::{HostState, PriceFeed, PublishedState, ScalarSetting};
use crate::domain::LocalDateTime;
use crate::error::HostError;

/// Host state held entirely in memory with a fixed clock.
///
/// Used for replaying snapshots and by the test suites.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    pub now: Option<LocalDateTime>,
    pub feeds: HashMap<String, PriceFeed>,
    pub settings: HashMap<String, ScalarSetting>,
    pub outputs: HashMap<String, PublishedState>,
    /// Output ids in the order they were published
    pub publish_log: Vec<String>,
}

impl InMemoryHost {
    pub fn new(now: LocalDateTime) -> Self {
        Self {
            now: Some(now),
            ..Default::default()
        }
    }

    pub fn with_feed(mut self, id: impl Into<String>, feed: PriceFeed) -> Self {
        self.feeds.insert(id.into(), feed);
        self
    }

    pub fn with_setting(mut self, id: impl Into<String>, setting: ScalarSetting) -> Self {
        self.settings.insert(id.into(), setting);
        self
    }

    pub fn set_now(&mut self, now: LocalDateTime) {
        self.now = Some(now);
    }

    pub fn output(&self, id: &str) -> Option<&PublishedState> {
        self.outputs.get(id)
    }

    pub fn clear_log(&mut self) {
        self.publish_log.clear();
    }
}

impl HostState for InMemoryHost {
    fn current_instant(&self) -> Result<LocalDateTime, HostError> {
        self.now
            .ok_or_else(|| HostError::Clock("no clock configured".to_string()))
    }

    fn price_feed(&self, source_id: &str) -> Result<Option<PriceFeed>, HostError> {
        Ok(self.feeds.get(source_id).cloned())
    }

    fn scalar_setting(&self, id: &str) -> Result<Option<ScalarSetting>, HostError> {
        Ok(self.settings.get(id).cloned())
    }

    fn previous_result(&self, id: &str) -> Result<Option<PublishedState>, HostError> {
        Ok(self.outputs.get(id).cloned())
    }

    fn publish(&mut self, id: &str, state: PublishedState) -> Result<(), HostError> {
        self.publish_log.push(id.to_string());
        self.outputs.insert(id.to_string(), state);
        Ok(())
    }
}
