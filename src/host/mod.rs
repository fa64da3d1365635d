//! The host automation platform as seen by the planner.
//!
//! The core reads feeds, settings and the previous result through
//! [`HostState`] and writes every output back through it. Nothing is kept
//! in-process between runs.

pub mod file;
pub mod memory;

pub use file::JsonFileHost;
pub use memory::InMemoryHost;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::LocalDateTime;
use crate::error::HostError;

/// Literal state used for the explicit unavailable marker
pub const UNAVAILABLE: &str = "unavailable";

#[cfg_attr(test, mockall::automock)]
pub trait HostState {
    /// Timezone-aware "now"
    fn current_instant(&self) -> Result<LocalDateTime, HostError>;

    /// Raw entries of a price feed, or `None` if the feed does not exist
    fn price_feed(&self, source_id: &str) -> Result<Option<PriceFeed>, HostError>;

    fn scalar_setting(&self, id: &str) -> Result<Option<ScalarSetting>, HostError>;

    fn previous_result(&self, id: &str) -> Result<Option<PublishedState>, HostError>;

    fn publish(&mut self, id: &str, state: PublishedState) -> Result<(), HostError>;
}

/// A price feed as stored by the host.
///
/// Entries stay as raw JSON so that a malformed one can be skipped on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFeed {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

/// A user-editable input and when it was last modified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarSetting {
    pub value: Option<String>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
}

impl ScalarSetting {
    pub fn new(value: impl Into<String>, last_changed: DateTime<Utc>) -> Self {
        Self {
            value: Some(value.into()),
            last_changed: Some(last_changed),
        }
    }
}

/// Value of a published output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum StateValue {
    Number(f64),
    Text(String),
    Unavailable,
}

impl StateValue {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Unavailable => Some(UNAVAILABLE),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map_or(Self::Unavailable, Self::Number),
            Value::String(s) if s == UNAVAILABLE => Self::Unavailable,
            Value::String(s) => Self::Text(s),
            Value::Null => Self::Unavailable,
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<StateValue> for Value {
    fn from(value: StateValue) -> Self {
        match value {
            StateValue::Number(n) => serde_json::Number::from_f64(n)
                .map_or_else(|| Value::String(UNAVAILABLE.into()), Value::Number),
            StateValue::Text(s) => Value::String(s),
            StateValue::Unavailable => Value::String(UNAVAILABLE.into()),
        }
    }
}

/// An output value together with its descriptive attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedState {
    pub state: StateValue,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl PublishedState {
    pub fn new(state: StateValue, attributes: Map<String, Value>) -> Self {
        Self { state, attributes }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
