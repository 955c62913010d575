//! Maps an embedder's entry ids to their live coordinators.

use std::collections::HashMap;

use serde_json::Value;

use crate::connector::ClientError;
use crate::coordinator::Coordinator;
use crate::model::{Intent, IntentError};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown entry: {0}")]
    UnknownEntry(String),
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Owned map of live coordinators, keyed by the embedder's entry id.
///
/// The named intents dispatched through [`dispatch`](Self::dispatch) are
/// shared across all entries: the embedder registers the intent names with
/// its service surface when the first entry is inserted, and deregisters
/// them when [`remove`](Self::remove) leaves the registry empty.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, Coordinator>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry_id: impl Into<String>, coordinator: Coordinator) {
        let entry_id = entry_id.into();
        if self.entries.is_empty() {
            log::debug!("First entry added, shared intents become available");
        }
        if self.entries.insert(entry_id.clone(), coordinator).is_some() {
            log::warn!("Replaced existing entry: {entry_id}");
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<&Coordinator> {
        self.entries.get(entry_id)
    }

    /// Remove an entry, handing its coordinator back for shutdown.
    ///
    /// When this leaves the registry empty, shared intents should be
    /// deregistered; check [`is_empty`](Self::is_empty).
    pub fn remove(&mut self, entry_id: &str) -> Option<Coordinator> {
        let coordinator = self.entries.remove(entry_id);
        if coordinator.is_some() && self.entries.is_empty() {
            log::debug!("Last entry removed, shared intents can be deregistered");
        }
        coordinator
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forward a named intent with JSON arguments to one entry.
    pub async fn dispatch(
        &self,
        entry_id: &str,
        name: &str,
        args: &Value,
    ) -> Result<(), DispatchError> {
        let coordinator = self
            .entries
            .get(entry_id)
            .ok_or_else(|| DispatchError::UnknownEntry(entry_id.to_string()))?;

        let intent = Intent::parse(name, args)?;
        coordinator.send_intent(intent).await?;

        Ok(())
    }
}
