// crates/mobile-core/src/runtime/registry.rs
// ============================================================================
// Module: Mobile Core API-Key Registry
// Description: Singleton secret record mapping app ids to API keys.
// Purpose: Apply key additions and removals without losing concurrent writes.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The registry is one secret-style record whose `apiKeys` field holds a JSON
//! object `{app_id: api_key}`. Every mutation is a read-modify-write that
//! carries the resource version it read; a stale write is rejected by the
//! store and the whole cycle is retried, up to a bounded number of attempts.
//!
//! # Invariants
//! - A missing record or a missing, empty, or `null` payload decodes as an
//!   empty map.
//! - Removing an absent key, or removing from an absent record, succeeds
//!   without writing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::ObjectMeta;
use crate::core::SecretRecord;
use crate::interfaces::SharedSecretStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default registry record name.
pub const DEFAULT_REGISTRY_NAME: &str = "mcp-mobile-keys";
/// Default number of read-modify-write attempts before giving up.
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: u32 = 8;
/// Display name stored on the registry record.
const REGISTRY_DISPLAY_NAME: &str = "API Keys";
/// Data key holding the JSON key map.
const API_KEYS_FIELD: &str = "apiKeys";

/// Key map type stored in the registry.
type KeyMap = BTreeMap<String, String>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// API-key registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Store operation failed.
    #[error("api key registry store error during {context}: {source}")]
    Store {
        /// Operation being performed.
        context: &'static str,
        /// Underlying store error.
        source: StoreError,
    },
    /// Key map payload could not be encoded or decoded.
    #[error("api key registry codec error: {0}")]
    Codec(String),
    /// Concurrent writers exhausted the retry budget.
    #[error("api key registry {name} still contended after {attempts} attempts")]
    Contention {
        /// Registry record name.
        name: String,
        /// Attempts made.
        attempts: u32,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Shared map of app ids to API keys.
#[derive(Clone)]
pub struct ApiKeyRegistry {
    /// Backing secret-record store.
    store: SharedSecretStore,
    /// Registry record name.
    name: String,
    /// Read-modify-write attempt budget.
    max_attempts: u32,
}

impl ApiKeyRegistry {
    /// Creates a registry using the default record name and retry budget.
    #[must_use]
    pub fn new(store: SharedSecretStore) -> Self {
        Self {
            store,
            name: DEFAULT_REGISTRY_NAME.to_string(),
            max_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
        }
    }

    /// Returns the registry with a custom record name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the registry with a custom retry budget (at least one attempt).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the registry record name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the registry record with an empty map if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] when the store fails.
    pub fn ensure_map_exists(&self) -> Result<(), RegistryError> {
        match self.store.get(&self.name) {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(_)) => {
                match self.store.create(self.new_record(&KeyMap::new())?) {
                    Ok(_) | Err(StoreError::AlreadyExists(_)) => Ok(()),
                    Err(source) => Err(RegistryError::Store {
                        context: "create key map",
                        source,
                    }),
                }
            }
            Err(source) => Err(RegistryError::Store {
                context: "read key map",
                source,
            }),
        }
    }

    /// Sets the API key for an app, creating the registry if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the store fails, the payload is corrupt,
    /// or the retry budget is exhausted.
    pub fn add_entry(&self, app_id: &str, api_key: &str) -> Result<(), RegistryError> {
        self.mutate(true, |keys| {
            keys.insert(app_id.to_string(), api_key.to_string()).as_deref() != Some(api_key)
        })
        .map(drop)
    }

    /// Sets the API key for an app only when no key is registered yet.
    ///
    /// Returns true when the key was written.
    pub(crate) fn add_missing_entry(
        &self,
        app_id: &str,
        api_key: &str,
    ) -> Result<bool, RegistryError> {
        self.mutate(true, |keys| {
            if keys.contains_key(app_id) {
                return false;
            }
            keys.insert(app_id.to_string(), api_key.to_string());
            true
        })
    }

    /// Removes the API key for an app; absent keys are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the store fails, the payload is corrupt,
    /// or the retry budget is exhausted.
    pub fn remove_entry(&self, app_id: &str) -> Result<(), RegistryError> {
        self.take_entry(app_id).map(drop)
    }

    /// Removes the API key for an app, returning true when a key was removed.
    pub(crate) fn take_entry(&self, app_id: &str) -> Result<bool, RegistryError> {
        self.mutate(false, |keys| keys.remove(app_id).is_some())
    }

    /// Returns a snapshot of every registered key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the store fails or the payload is corrupt.
    pub fn entries(&self) -> Result<BTreeMap<String, String>, RegistryError> {
        match self.store.get(&self.name) {
            Ok(record) => decode_key_map(record.data.get(API_KEYS_FIELD)),
            Err(StoreError::NotFound(_)) => Ok(KeyMap::new()),
            Err(source) => Err(RegistryError::Store {
                context: "read key map",
                source,
            }),
        }
    }

    /// Returns the API key registered for an app, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the store fails or the payload is corrupt.
    pub fn lookup(&self, app_id: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.entries()?.remove(app_id))
    }

    /// Runs a versioned read-modify-write cycle with bounded retries.
    ///
    /// `apply` returns false when the map is unchanged, which skips the write.
    /// Returns true when a write was committed.
    fn mutate(
        &self,
        create_if_missing: bool,
        apply: impl Fn(&mut KeyMap) -> bool,
    ) -> Result<bool, RegistryError> {
        for _ in 0 .. self.max_attempts {
            match self.store.get(&self.name) {
                Ok(mut record) => {
                    let mut keys = decode_key_map(record.data.get(API_KEYS_FIELD))?;
                    if !apply(&mut keys) {
                        return Ok(false);
                    }
                    record.data.insert(API_KEYS_FIELD.to_string(), encode_key_map(&keys)?);
                    match self.store.update(record) {
                        Ok(_) => return Ok(true),
                        Err(StoreError::Conflict(_) | StoreError::NotFound(_)) => {}
                        Err(source) => {
                            return Err(RegistryError::Store {
                                context: "update key map",
                                source,
                            });
                        }
                    }
                }
                Err(StoreError::NotFound(_)) if create_if_missing => {
                    let mut keys = KeyMap::new();
                    let changed = apply(&mut keys);
                    match self.store.create(self.new_record(&keys)?) {
                        Ok(_) => return Ok(changed),
                        Err(StoreError::AlreadyExists(_)) => {}
                        Err(source) => {
                            return Err(RegistryError::Store {
                                context: "create key map",
                                source,
                            });
                        }
                    }
                }
                Err(StoreError::NotFound(_)) => return Ok(false),
                Err(source) => {
                    return Err(RegistryError::Store {
                        context: "read key map",
                        source,
                    });
                }
            }
        }
        Err(RegistryError::Contention {
            name: self.name.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Builds a fresh registry record holding `keys`.
    fn new_record(&self, keys: &KeyMap) -> Result<SecretRecord, RegistryError> {
        let mut record = SecretRecord {
            meta: ObjectMeta::named(self.name.clone()),
            data: BTreeMap::new(),
        };
        record.data.insert("name".to_string(), self.name.as_bytes().to_vec());
        record.data.insert("type".to_string(), self.name.as_bytes().to_vec());
        record.data.insert("displayName".to_string(), REGISTRY_DISPLAY_NAME.as_bytes().to_vec());
        record.data.insert(API_KEYS_FIELD.to_string(), encode_key_map(keys)?);
        Ok(record)
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Decodes the key map payload; absent, empty, or `null` payloads are empty.
fn decode_key_map(payload: Option<&Vec<u8>>) -> Result<KeyMap, RegistryError> {
    let Some(bytes) = payload.filter(|bytes| !bytes.iter().all(u8::is_ascii_whitespace)) else {
        return Ok(KeyMap::new());
    };
    let decoded: Option<KeyMap> =
        serde_json::from_slice(bytes).map_err(|err| RegistryError::Codec(err.to_string()))?;
    Ok(decoded.unwrap_or_default())
}

/// Encodes the key map payload.
fn encode_key_map(keys: &KeyMap) -> Result<Vec<u8>, RegistryError> {
    serde_json::to_vec(keys).map_err(|err| RegistryError::Codec(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
