use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{HostState, PriceFeed, PublishedState, ScalarSetting};
use crate::domain::LocalDateTime;
use crate::error::HostError;

/// On-disk layout of the shared state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub feeds: BTreeMap<String, PriceFeed>,
    #[serde(default)]
    pub settings: BTreeMap<String, ScalarSetting>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PublishedState>,
}

/// Host state backed by a JSON document that an external bridge keeps
/// up to date with feeds and settings. Outputs are written back into the
/// same document.
///
/// Publishes are staged in memory until [`JsonFileHost::flush`], which
/// writes only the staged outputs over the current on-disk document.
#[derive(Debug)]
pub struct JsonFileHost {
    path: PathBuf,
    tz: Tz,
    document: StateDocument,
    staged: BTreeSet<String>,
}

impl JsonFileHost {
    /// Open the document, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>, tz: Tz) -> Result<Self, HostError> {
        let path = path.into();
        let document = Self::read(&path)?;
        info!(path = %path.display(), feeds = document.feeds.len(), "opened state document");
        Ok(Self {
            path,
            tz,
            document,
            staged: BTreeSet::new(),
        })
    }

    /// Re-read feeds and settings written since the last run.
    ///
    /// Outputs staged but not yet flushed are kept.
    pub fn reload(&mut self) -> Result<(), HostError> {
        let mut document = Self::read(&self.path)?;
        for id in &self.staged {
            if let Some(state) = self.document.outputs.get(id) {
                document.outputs.insert(id.clone(), state.clone());
            }
        }
        self.document = document;
        debug!(path = %self.path.display(), "reloaded state document");
        Ok(())
    }

    /// Number of outputs published since the last flush
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// Write staged outputs in one save.
    ///
    /// The document is re-read first so feeds and settings the bridge wrote
    /// during the run are preserved.
    pub fn flush(&mut self) -> Result<(), HostError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut on_disk = Self::read(&self.path)?;
        for id in &self.staged {
            if let Some(state) = self.document.outputs.get(id) {
                on_disk.outputs.insert(id.clone(), state.clone());
            }
        }
        Self::save(&self.path, &on_disk)?;
        debug!(path = %self.path.display(), outputs = self.staged.len(), "flushed outputs");
        self.staged.clear();
        self.document = on_disk;
        Ok(())
    }

    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    fn read(path: &Path) -> Result<StateDocument, HostError> {
        if !path.exists() {
            return Ok(StateDocument::default());
        }
        let body = fs::read_to_string(path)?;
        if body.trim().is_empty() {
            return Ok(StateDocument::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Write through a sibling temp file so readers never see a partial document
    fn save(path: &Path, document: &StateDocument) -> Result<(), HostError> {
        let body = serde_json::to_string_pretty(document)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl HostState for JsonFileHost {
    fn current_instant(&self) -> Result<LocalDateTime, HostError> {
        Ok(Utc::now().with_timezone(&self.tz))
    }

    fn price_feed(&self, source_id: &str) -> Result<Option<PriceFeed>, HostError> {
        Ok(self.document.feeds.get(source_id).cloned())
    }

    fn scalar_setting(&self, id: &str) -> Result<Option<ScalarSetting>, HostError> {
        Ok(self.document.settings.get(id).cloned())
    }

    fn previous_result(&self, id: &str) -> Result<Option<PublishedState>, HostError> {
        Ok(self.document.outputs.get(id).cloned())
    }

    fn publish(&mut self, id: &str, state: PublishedState) -> Result<(), HostError> {
        self.document.outputs.insert(id.to_string(), state);
        self.staged.insert(id.to_string());
        Ok(())
    }
}
