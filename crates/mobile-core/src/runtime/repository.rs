// crates/mobile-core/src/runtime/repository.rs
// ============================================================================
// Module: Mobile Core App Repository
// Description: CRUD over app records stored as config-style records.
// Purpose: Enforce name uniqueness, id assignment, and validation on writes.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The repository maps [`App`] values onto [`ConfigRecord`]s. The record name
//! is the app id; the app name is mirrored into a label so name lookups are
//! label-filtered lists. Every mutating call performs at most one store read
//! followed by one store write.
//!
//! Name uniqueness is checked with a read before the create. Two concurrent
//! creates of the same name can both pass that check; ids still differ, so
//! neither record is lost.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::APP_GROUP_LABEL;
use crate::core::APP_GROUP_VALUE;
use crate::core::APP_NAME_LABEL;
use crate::core::App;
use crate::core::CREATED_METADATA_KEY;
use crate::core::ClientType;
use crate::core::Clock;
use crate::core::ConfigRecord;
use crate::core::ICON_METADATA_KEY;
use crate::core::ObjectMeta;
use crate::core::SystemClock;
use crate::core::format_created;
use crate::interfaces::AppValidator;
use crate::interfaces::LabelSelector;
use crate::interfaces::SharedConfigStore;
use crate::interfaces::StoreError;
use crate::interfaces::ValidationError;
use crate::runtime::validator::DefaultAppValidator;

// ============================================================================
// SECTION: Record Fields
// ============================================================================

/// Data key holding the app name.
const FIELD_NAME: &str = "name";
/// Data key holding the display name.
const FIELD_DISPLAY_NAME: &str = "displayName";
/// Data key holding the client type.
const FIELD_CLIENT_TYPE: &str = "clientType";
/// Data key holding the API key copy.
const FIELD_API_KEY: &str = "apiKey";
/// Data key holding the description.
const FIELD_DESCRIPTION: &str = "description";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// App repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// App does not exist.
    #[error("app not found: {0}")]
    NotFound(String),
    /// App name or id is already taken, or the record changed underneath.
    #[error("app conflict: {0}")]
    Conflict(String),
    /// Validator rejected the app.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Clock value could not be rendered.
    #[error("app timestamp error: {0}")]
    Clock(String),
    /// Store operation failed.
    #[error("app store error during {context}: {source}")]
    Store {
        /// Operation being performed.
        context: &'static str,
        /// Underlying store error.
        source: StoreError,
    },
}

impl RepositoryError {
    /// Wraps a store error with operation context.
    fn store(context: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound(name) => Self::NotFound(name),
            StoreError::AlreadyExists(name) => Self::Conflict(format!("{name} already exists")),
            StoreError::Conflict(detail) => Self::Conflict(detail),
            source => Self::Store {
                context,
                source,
            },
        }
    }
}

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Repository of app records.
#[derive(Clone)]
pub struct AppRepository {
    /// Backing config-record store.
    store: SharedConfigStore,
    /// Validation hook run before writes.
    validator: Arc<dyn AppValidator>,
    /// Clock used for ids and creation timestamps.
    clock: Arc<dyn Clock>,
}

impl AppRepository {
    /// Creates a repository with the default validator and system clock.
    #[must_use]
    pub fn new(store: SharedConfigStore) -> Self {
        Self {
            store,
            validator: Arc::new(DefaultAppValidator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Returns the repository with a custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn AppValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Returns the repository with a custom clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the backing store handle.
    #[must_use]
    pub fn store(&self) -> &SharedConfigStore {
        &self.store
    }

    /// Reads an app by name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no app has the name.
    pub fn read_by_name(&self, name: &str) -> Result<App, RepositoryError> {
        self.find_record_by_name(name)?
            .map(|record| app_from_record(&record))
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }

    /// Reads an app by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no app has the id.
    pub fn read(&self, id: &str) -> Result<App, RepositoryError> {
        let record = self.store.get(id).map_err(|err| RepositoryError::store("read app", err))?;
        if !is_app_record(&record) {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(app_from_record(&record))
    }

    /// Creates an app, assigning its id and creation timestamp.
    ///
    /// The assigned `id` and `created` metadata are written back into `app`
    /// only when the record was stored.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] when the validator rejects the
    /// app and [`RepositoryError::Conflict`] when the name is taken.
    pub fn create(&self, app: &mut App) -> Result<(), RepositoryError> {
        self.validator.pre_create(app)?;
        if self.find_record_by_name(&app.name)?.is_some() {
            return Err(RepositoryError::Conflict(format!("app name {} already exists", app.name)));
        }
        let now = self.clock.now();
        let created = format_created(now).map_err(|err| RepositoryError::Clock(err.to_string()))?;
        let mut assigned = app.clone();
        assigned.id = format!("{}-{}", app.name, now.unix_timestamp());
        assigned.metadata.insert(CREATED_METADATA_KEY.to_string(), created);
        self.store
            .create(record_from_app(&assigned))
            .map_err(|err| RepositoryError::store("create app", err))?;
        *app = assigned;
        Ok(())
    }

    /// Updates an app's name and client type, preserving every other field.
    ///
    /// The existing record is located by `app.id` when set, else by name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the app is absent,
    /// [`RepositoryError::Validation`] when the validator rejects the update,
    /// and [`RepositoryError::Conflict`] when the new name is taken by another
    /// app or the record changed concurrently.
    pub fn update(&self, app: &App) -> Result<App, RepositoryError> {
        let mut record = if app.id.is_empty() {
            self.find_record_by_name(&app.name)?
                .ok_or_else(|| RepositoryError::NotFound(app.name.clone()))?
        } else {
            let record =
                self.store.get(&app.id).map_err(|err| RepositoryError::store("read app", err))?;
            if !is_app_record(&record) {
                return Err(RepositoryError::NotFound(app.id.clone()));
            }
            record
        };
        let old = app_from_record(&record);
        self.validator.pre_update(&old, app)?;
        if app.name != old.name
            && self
                .find_record_by_name(&app.name)?
                .is_some_and(|existing| existing.meta.name != record.meta.name)
        {
            return Err(RepositoryError::Conflict(format!("app name {} already exists", app.name)));
        }
        record.data.insert(FIELD_NAME.to_string(), app.name.clone());
        record.data.insert(FIELD_CLIENT_TYPE.to_string(), app.client_type.as_str().to_string());
        record.meta.labels.insert(APP_NAME_LABEL.to_string(), app.name.clone());
        let stored =
            self.store.update(record).map_err(|err| RepositoryError::store("update app", err))?;
        Ok(app_from_record(&stored))
    }

    /// Deletes the app record with the given record name (the app id).
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the record is absent.
    pub fn delete_by_name(&self, record_name: &str) -> Result<(), RepositoryError> {
        self.store.delete(record_name).map_err(|err| RepositoryError::store("delete app", err))
    }

    /// Lists every app in store order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when listing fails.
    pub fn list(&self) -> Result<Vec<App>, RepositoryError> {
        let selector = LabelSelector::new().with(APP_GROUP_LABEL, APP_GROUP_VALUE);
        let records =
            self.store.list(&selector).map_err(|err| RepositoryError::store("list apps", err))?;
        Ok(records.iter().map(app_from_record).collect())
    }

    /// Finds the first app record carrying the name label.
    fn find_record_by_name(&self, name: &str) -> Result<Option<ConfigRecord>, RepositoryError> {
        let selector = LabelSelector::new()
            .with(APP_GROUP_LABEL, APP_GROUP_VALUE)
            .with(APP_NAME_LABEL, name);
        let records = self
            .store
            .list(&selector)
            .map_err(|err| RepositoryError::store("find app by name", err))?;
        Ok(records.into_iter().next())
    }
}

// ============================================================================
// SECTION: Record Mapping
// ============================================================================

/// Returns true when the record carries the app group label.
fn is_app_record(record: &ConfigRecord) -> bool {
    record.meta.labels.get(APP_GROUP_LABEL).is_some_and(|value| value == APP_GROUP_VALUE)
}

/// Builds the stored record for an app.
fn record_from_app(app: &App) -> ConfigRecord {
    let mut meta = ObjectMeta::named(app.id.clone());
    meta.labels.clone_from(&app.labels);
    meta.labels.insert(APP_GROUP_LABEL.to_string(), APP_GROUP_VALUE.to_string());
    meta.labels.insert(APP_NAME_LABEL.to_string(), app.name.clone());
    for key in [ICON_METADATA_KEY, CREATED_METADATA_KEY] {
        if let Some(value) = app.metadata.get(key) {
            meta.annotations.insert(key.to_string(), value.clone());
        }
    }
    let mut record = ConfigRecord {
        meta,
        data: BTreeMap::new(),
    };
    record.data.insert(FIELD_NAME.to_string(), app.name.clone());
    record.data.insert(FIELD_DISPLAY_NAME.to_string(), app.display_name.clone());
    record.data.insert(FIELD_CLIENT_TYPE.to_string(), app.client_type.as_str().to_string());
    record.data.insert(FIELD_API_KEY.to_string(), app.api_key.clone());
    record.data.insert(FIELD_DESCRIPTION.to_string(), app.description.clone());
    record
}

/// Rebuilds an app from its stored record.
fn app_from_record(record: &ConfigRecord) -> App {
    let field = |key: &str| record.data.get(key).cloned().unwrap_or_default();
    let metadata = [ICON_METADATA_KEY, CREATED_METADATA_KEY]
        .into_iter()
        .filter_map(|key| {
            record
                .meta
                .annotations
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect();
    App {
        id: record.meta.name.clone(),
        name: field(FIELD_NAME),
        display_name: field(FIELD_DISPLAY_NAME),
        client_type: ClientType::parse(&field(FIELD_CLIENT_TYPE)),
        api_key: field(FIELD_API_KEY),
        description: field(FIELD_DESCRIPTION),
        labels: record.meta.labels.clone(),
        metadata,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::app_from_record;
    use super::record_from_app;
    use crate::core::App;
    use crate::core::ClientType;

    #[test]
    fn record_mapping_preserves_app_fields() {
        let mut app = App::new("shop", ClientType::Cordova).with_description("store front");
        app.id = "shop-1".to_string();
        app.api_key = "key".to_string();
        app.metadata.insert("icon".to_string(), "icon-cordova".to_string());
        app.metadata.insert("created".to_string(), "2023-11-14 22:13:20".to_string());
        let record = record_from_app(&app);
        assert_eq!(record.meta.name, "shop-1");
        assert_eq!(record.meta.labels.get("group").map(String::as_str), Some("mobileapp"));
        assert_eq!(record.data.get("clientType").map(String::as_str), Some("cordova"));
        let mut expected = app;
        expected.labels.insert("group".to_string(), "mobileapp".to_string());
        expected.labels.insert("name".to_string(), "shop".to_string());
        assert_eq!(app_from_record(&record), expected);
    }
}
