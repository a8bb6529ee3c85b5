// crates/mobile-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mobile Core Interfaces
// Description: Backend-agnostic object store and app validation contracts.
// Purpose: Define the seams hosts implement to plug in storage and policy.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define the object store contract the runtime depends on and the
//! validator hook run before app writes. Implementations must fail closed:
//! a store that cannot prove a write is current must reject it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::App;
use crate::core::ConfigRecord;
use crate::core::ObjectMeta;
use crate::core::SecretRecord;

// ============================================================================
// SECTION: Stored Records
// ============================================================================

/// Record kind persisted by an [`ObjectStore`].
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// Stable kind label used to partition storage.
    const KIND: &'static str;

    /// Returns the record metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Returns the record metadata mutably.
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

impl StoredRecord for ConfigRecord {
    const KIND: &'static str = "config";

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

impl StoredRecord for SecretRecord {
    const KIND: &'static str = "secret";

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

// ============================================================================
// SECTION: Label Selector
// ============================================================================

/// Equality-based label selector.
///
/// An empty selector matches every record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSelector {
    /// Required label values.
    required: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Creates an empty selector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            required: BTreeMap::new(),
        }
    }

    /// Returns the selector with an additional required label.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required.insert(key.into(), value.into());
        self
    }

    /// Returns true when every required label is present with its value.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.required.iter().all(|(key, value)| labels.get(key) == Some(value))
    }
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Named record does not exist.
    #[error("object store record not found: {0}")]
    NotFound(String),
    /// Named record already exists.
    #[error("object store record already exists: {0}")]
    AlreadyExists(String),
    /// Write carried a stale resource version.
    #[error("object store version conflict: {0}")]
    Conflict(String),
    /// Store I/O error.
    #[error("object store io error: {0}")]
    Io(String),
    /// Record data is invalid.
    #[error("object store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("object store error: {0}")]
    Store(String),
}

/// Named-record store with label listing and optimistic versioning.
///
/// # Invariants
/// - `create` and `update` assign a new, strictly increasing
///   `resource_version` to the returned record.
/// - `update` succeeds only when the supplied `resource_version` equals the
///   stored one; otherwise it returns [`StoreError::Conflict`].
pub trait ObjectStore<R: StoredRecord>: Send + Sync {
    /// Loads a record by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record is absent.
    fn get(&self, name: &str) -> Result<R, StoreError>;

    /// Creates a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the name is taken.
    fn create(&self, record: R) -> Result<R, StoreError>;

    /// Replaces an existing record if its version is current.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Conflict`].
    fn update(&self, record: R) -> Result<R, StoreError>;

    /// Deletes a record by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record is absent.
    fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Lists records matching the selector in store-defined order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self, selector: &LabelSelector) -> Result<Vec<R>, StoreError>;

    /// Checks whether the store is ready to serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Shared handle to a config-record store.
pub type SharedConfigStore = Arc<dyn ObjectStore<ConfigRecord>>;

/// Shared handle to a secret-record store.
pub type SharedSecretStore = Arc<dyn ObjectStore<SecretRecord>>;

// ============================================================================
// SECTION: App Validation
// ============================================================================

/// App validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// App field failed validation.
    #[error("invalid app {field}: {reason}")]
    InvalidField {
        /// Offending field name.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Validation hook run before app writes.
pub trait AppValidator: Send + Sync {
    /// Validates an app before creation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the app is rejected.
    fn pre_create(&self, app: &App) -> Result<(), ValidationError>;

    /// Validates an update from `old` to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the update is rejected.
    fn pre_update(&self, old: &App, new: &App) -> Result<(), ValidationError>;
}
