// crates/mobile-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Mobile Core App Lifecycle
// Description: Create/delete orchestration across repository and registry.
// Purpose: Issue API keys, sequence writes, and surface partial failures.
// Dependencies: crate::{core, runtime}, base64, rand, subtle
// ============================================================================

//! ## Overview
//! The lifecycle service is the only writer that touches both the app
//! repository and the API-key registry. Creation writes the app record first
//! and the registry second; deletion runs in reverse. There is no automatic
//! rollback: when the second step fails the caller receives
//! [`LifecycleError::PartialFailure`] naming the app, and
//! [`AppLifecycleService::reconcile`] repairs the divergence later.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::App;
use crate::core::ICON_METADATA_KEY;
use crate::runtime::registry::ApiKeyRegistry;
use crate::runtime::registry::RegistryError;
use crate::runtime::repository::AppRepository;
use crate::runtime::repository::RepositoryError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes per generated API key (256 bits).
const API_KEY_BYTES: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Second lifecycle step that can fail after the first one succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    /// Registering the key after the app record was created.
    RegisterApiKey,
    /// Removing the key after the app record was deleted.
    UnregisterApiKey,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterApiKey => f.write_str("register api key"),
            Self::UnregisterApiKey => f.write_str("unregister api key"),
        }
    }
}

/// App lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Repository step failed; nothing was changed by this call.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The app record changed but the registry step failed.
    #[error("partial failure for app {app_id}: {step} failed: {source}")]
    PartialFailure {
        /// App whose record and registry entry diverged.
        app_id: String,
        /// Step that failed.
        step: LifecycleStep,
        /// Registry error.
        source: RegistryError,
    },
    /// Presented API key does not match the registered key.
    #[error("invalid api key for app {0}")]
    InvalidApiKey(String),
}

// ============================================================================
// SECTION: Reconcile Report
// ============================================================================

/// Outcome of a registry reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// App ids whose missing keys were registered.
    pub registered: Vec<String>,
    /// Registry entries removed because their app no longer exists.
    pub pruned: Vec<String>,
}

impl ReconcileReport {
    /// Returns true when the pass changed nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.registered.is_empty() && self.pruned.is_empty()
    }
}

// ============================================================================
// SECTION: Key Generation
// ============================================================================

/// Generates a fresh API key from the OS random source.
#[must_use]
pub fn generate_api_key() -> String {
    let mut bytes = [0_u8; API_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// ============================================================================
// SECTION: Lifecycle Service
// ============================================================================

/// Orchestrates app creation and deletion.
#[derive(Clone)]
pub struct AppLifecycleService {
    /// App record repository.
    repository: AppRepository,
    /// Shared API-key registry.
    registry: ApiKeyRegistry,
}

impl AppLifecycleService {
    /// Creates a lifecycle service.
    #[must_use]
    pub const fn new(repository: AppRepository, registry: ApiKeyRegistry) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// Returns the app repository.
    #[must_use]
    pub const fn repository(&self) -> &AppRepository {
        &self.repository
    }

    /// Returns the API-key registry.
    #[must_use]
    pub const fn registry(&self) -> &ApiKeyRegistry {
        &self.registry
    }

    /// Creates an app with a fresh API key and registers the key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Repository`] when the record write fails and
    /// [`LifecycleError::PartialFailure`] when the record was written but the
    /// key could not be registered.
    pub fn create(&self, mut app: App) -> Result<App, LifecycleError> {
        app.api_key = generate_api_key();
        if let Some(icon) = app.client_type.icon() {
            app.metadata.insert(ICON_METADATA_KEY.to_string(), icon.to_string());
        }
        self.repository.create(&mut app)?;
        self.registry.add_entry(&app.id, &app.api_key).map_err(|source| {
            LifecycleError::PartialFailure {
                app_id: app.id.clone(),
                step: LifecycleStep::RegisterApiKey,
                source,
            }
        })?;
        Ok(app)
    }

    /// Deletes an app record and unregisters its key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Repository`] when the record delete fails
    /// and [`LifecycleError::PartialFailure`] when the record was deleted but
    /// the key could not be removed.
    pub fn delete(&self, app_id: &str) -> Result<(), LifecycleError> {
        self.repository.delete_by_name(app_id)?;
        self.registry.remove_entry(app_id).map_err(|source| LifecycleError::PartialFailure {
            app_id: app_id.to_string(),
            step: LifecycleStep::UnregisterApiKey,
            source,
        })
    }

    /// Verifies a presented API key against the registered key for an app.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Repository`] when the app is absent and
    /// [`LifecycleError::InvalidApiKey`] when the key does not match or no
    /// key is registered.
    pub fn verify_api_key(&self, app_id: &str, presented: &str) -> Result<App, LifecycleError> {
        let app = self.repository.read(app_id)?;
        let Some(expected) = self.registry.lookup(app_id)? else {
            return Err(LifecycleError::InvalidApiKey(app_id.to_string()));
        };
        if presented.is_empty() || !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(LifecycleError::InvalidApiKey(app_id.to_string()));
        }
        Ok(app)
    }

    /// Registers keys missing for existing apps and prunes orphaned entries.
    ///
    /// The registry is read before the app list. Creation writes the record
    /// before the key, so an entry whose app is absent from the later listing
    /// is an orphan. Each orphan is re-read right before it is pruned.
    /// Registered keys are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when listing or a registry write fails.
    pub fn reconcile(&self) -> Result<ReconcileReport, LifecycleError> {
        let entries = self.registry.entries()?;
        let apps = self.repository.list()?;
        let mut report = ReconcileReport::default();
        let mut live = BTreeSet::new();
        for app in &apps {
            live.insert(app.id.as_str());
            if app.api_key.is_empty() || entries.contains_key(&app.id) {
                continue;
            }
            if self.registry.add_missing_entry(&app.id, &app.api_key)? {
                report.registered.push(app.id.clone());
            }
        }
        for app_id in entries.keys() {
            if live.contains(app_id.as_str()) {
                continue;
            }
            match self.repository.read(app_id) {
                Ok(_) => continue,
                Err(RepositoryError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
            if self.registry.take_entry(app_id)? {
                report.pruned.push(app_id.clone());
            }
        }
        Ok(report)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
