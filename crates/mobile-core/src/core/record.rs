// crates/mobile-core/src/core/record.rs
// ============================================================================
// Module: Mobile Core Stored Records
// Description: Generic record shapes persisted by object stores.
// Purpose: Model named records with labels, annotations, and versions.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Object stores persist two record kinds: config-style records with string
//! values and secret-style records with byte values. Both share
//! [`ObjectMeta`], whose `resource_version` is assigned by the store and
//! checked on every update.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Metadata shared by every stored record.
///
/// # Invariants
/// - `resource_version` is assigned by the store; `0` marks an unsaved record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Record name, unique per record kind.
    pub name: String,
    /// Labels used for selector lookups.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Free-form annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Store-assigned version used for optimistic updates.
    #[serde(default)]
    pub resource_version: u64,
}

impl ObjectMeta {
    /// Creates metadata for an unsaved record.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Config-style record with string values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Record metadata.
    pub meta: ObjectMeta,
    /// String-valued payload.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Secret-style record with byte values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Record metadata.
    pub meta: ObjectMeta,
    /// Byte-valued payload.
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}
