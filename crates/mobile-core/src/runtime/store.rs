// crates/mobile-core/src/runtime/store.rs
// ============================================================================
// Module: Mobile Core In-Memory Store
// Description: Mutex-guarded in-memory object store.
// Purpose: Provide a versioned store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`ObjectStore`] for
//! tests and local runs. It enforces the same optimistic version checks as
//! durable stores, so concurrency behavior is identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::LabelSelector;
use crate::interfaces::ObjectStore;
use crate::interfaces::StoreError;
use crate::interfaces::StoredRecord;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable state behind the store mutex.
#[derive(Debug)]
struct StoreState<R> {
    /// Records keyed by name.
    records: BTreeMap<String, R>,
    /// Last assigned resource version.
    last_version: u64,
}

/// In-memory object store for tests and local runs.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore<R> {
    /// Record state protected by a mutex.
    state: Arc<Mutex<StoreState<R>>>,
}

impl<R> Default for InMemoryObjectStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> InMemoryObjectStore<R> {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                records: BTreeMap::new(),
                last_version: 0,
            })),
        }
    }

    /// Runs a closure against the locked state.
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut StoreState<R>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Store("object store mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

/// Rejects records without a usable name.
fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Invalid("record name must be non-empty".to_string()));
    }
    Ok(())
}

impl<R: StoredRecord> ObjectStore<R> for InMemoryObjectStore<R> {
    fn get(&self, name: &str) -> Result<R, StoreError> {
        self.with_state(|state| {
            state.records.get(name).cloned().ok_or_else(|| StoreError::NotFound(name.to_string()))
        })
    }

    fn create(&self, mut record: R) -> Result<R, StoreError> {
        let name = record.meta().name.clone();
        validate_name(&name)?;
        self.with_state(|state| {
            if state.records.contains_key(&name) {
                return Err(StoreError::AlreadyExists(name));
            }
            state.last_version += 1;
            record.meta_mut().resource_version = state.last_version;
            state.records.insert(name, record.clone());
            Ok(record)
        })
    }

    fn update(&self, mut record: R) -> Result<R, StoreError> {
        let name = record.meta().name.clone();
        validate_name(&name)?;
        self.with_state(|state| {
            let current = state
                .records
                .get(&name)
                .ok_or_else(|| StoreError::NotFound(name.clone()))?
                .meta()
                .resource_version;
            let supplied = record.meta().resource_version;
            if current != supplied {
                return Err(StoreError::Conflict(format!(
                    "{name}: supplied version {supplied}, stored version {current}"
                )));
            }
            state.last_version += 1;
            record.meta_mut().resource_version = state.last_version;
            state.records.insert(name, record.clone());
            Ok(record)
        })
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.with_state(|state| {
            state
                .records
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(name.to_string()))
        })
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<R>, StoreError> {
        self.with_state(|state| {
            Ok(state
                .records
                .values()
                .filter(|record| selector.matches(&record.meta().labels))
                .cloned()
                .collect())
        })
    }
}
