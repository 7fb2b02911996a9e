//! The store boundary: a trait over the platform's durable keyed records
//! plus an in-memory reference implementation for tests and headless runs.
//!
//! All mutation is read-modify-conditional-write keyed on the record's
//! `revision`. The engine never retries a transient failure internally;
//! the next external tick is safe to run because every operation is
//! idempotent against the persisted timestamps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::state::InnState;

/// Errors surfaced from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is temporarily unavailable; retry on the next tick.
    #[error("store temporarily unavailable: {0}")]
    Transient(String),
    /// The persisted blob exists but cannot be decoded.
    #[error("persisted record for {entity_id} is corrupt: {detail}")]
    Corrupt { entity_id: String, detail: String },
}

/// Durable keyed record per business instance.
///
/// `conditional_update` writes `record` only when the currently stored
/// revision equals `expected_revision` (zero for a record that does not
/// exist yet) and reports whether the write happened. Callers bump
/// `record.revision` themselves before writing; a `false` return means
/// another caller advanced the record first and the write must not be
/// reapplied.
pub trait PersistentStore {
    /// Load the record, or `None` for an entity never seen before.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the store is unavailable or the blob is
    /// undecodable.
    fn load(&self, entity_id: &str) -> Result<Option<InnState>, StoreError>;

    /// Compare-and-swap write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the store is unavailable.
    fn conditional_update(
        &self,
        entity_id: &str,
        expected_revision: u64,
        record: &InnState,
    ) -> Result<bool, StoreError>;
}

/// In-memory store used by tests and the headless tester. Clones share the
/// underlying records, so a caller can keep a handle after handing one to
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, InnState>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read of the raw record, bypassing the trait; test helper.
    #[must_use]
    pub fn raw(&self, entity_id: &str) -> Option<InnState> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }
}

impl PersistentStore for MemoryStore {
    fn load(&self, entity_id: &str) -> Result<Option<InnState>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned())
    }

    fn conditional_update(
        &self,
        entity_id: &str,
        expected_revision: u64,
        record: &InnState,
    ) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = records.get(entity_id).map_or(0, |r| r.revision);
        if current != expected_revision {
            return Ok(false);
        }
        records.insert(entity_id.to_string(), record.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_revision_zero() {
        let store = MemoryStore::new();
        let mut record = InnState::new("inn-1", 0);
        record.revision = 1;
        assert!(store.conditional_update("inn-1", 0, &record).unwrap());
        // A second creation attempt against revision zero loses.
        assert!(!store.conditional_update("inn-1", 0, &record).unwrap());
    }

    #[test]
    fn stale_revision_is_rejected() {
        let store = MemoryStore::new();
        let mut record = InnState::new("inn-1", 0);
        record.revision = 1;
        store.conditional_update("inn-1", 0, &record).unwrap();

        let mut ours = store.load("inn-1").unwrap().expect("stored");
        let mut theirs = ours.clone();

        theirs.revision = 2;
        assert!(store.conditional_update("inn-1", 1, &theirs).unwrap());

        ours.revision = 2;
        assert!(
            !store.conditional_update("inn-1", 1, &ours).unwrap(),
            "second writer must observe the race"
        );
        assert_eq!(store.raw("inn-1").map(|r| r.revision), Some(2));
    }

    #[test]
    fn load_missing_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.load("inn-404").unwrap().is_none());
    }
}
