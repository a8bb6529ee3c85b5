// crates/mobile-core/tests/registry.rs
// ============================================================================
// Module: API-Key Registry Tests
// Description: Tests for the shared API-key registry record.
// Purpose: Validate lazy creation, idempotent removal, and lost-update safety.
// Dependencies: mobile-core
// ============================================================================
//! ## Overview
//! Exercises [`mobile_core::ApiKeyRegistry`] including interleaved and
//! concurrent writers against the versioned in-memory store.

#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use common::AlwaysConflictStore;
use common::InterleavingStore;
use mobile_core::ApiKeyRegistry;
use mobile_core::InMemoryObjectStore;
use mobile_core::ObjectMeta;
use mobile_core::ObjectStore;
use mobile_core::RegistryError;
use mobile_core::SecretRecord;

fn registry() -> (InMemoryObjectStore<SecretRecord>, ApiKeyRegistry) {
    let store = InMemoryObjectStore::new();
    let registry = ApiKeyRegistry::new(Arc::new(store.clone()));
    (store, registry)
}

#[test]
fn ensure_map_exists_is_idempotent() {
    let (store, registry) = registry();
    registry.ensure_map_exists().unwrap();
    registry.ensure_map_exists().unwrap();

    let record = store.get("mcp-mobile-keys").unwrap();
    assert_eq!(record.data.get("apiKeys").map(Vec::as_slice), Some(b"{}".as_slice()));
    assert_eq!(record.data.get("displayName").map(Vec::as_slice), Some(b"API Keys".as_slice()));
    assert_eq!(record.data.get("type").map(Vec::as_slice), Some(b"mcp-mobile-keys".as_slice()));
}

#[test]
fn add_entry_creates_registry_lazily() {
    let (_, registry) = registry();
    registry.add_entry("shop-1", "k1").unwrap();
    assert_eq!(registry.lookup("shop-1").unwrap().as_deref(), Some("k1"));
}

#[test]
fn add_entry_overwrites_and_keeps_other_entries() {
    let (_, registry) = registry();
    registry.add_entry("a", "ka").unwrap();
    registry.add_entry("b", "kb").unwrap();
    registry.add_entry("a", "ka2").unwrap();

    let expected: BTreeMap<String, String> =
        [("a", "ka2"), ("b", "kb")].into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    assert_eq!(registry.entries().unwrap(), expected);
}

#[test]
fn remove_entry_absent_key_or_registry_is_noop() {
    let (store, registry) = registry();
    registry.remove_entry("ghost").unwrap();
    assert!(store.get("mcp-mobile-keys").is_err());

    registry.add_entry("a", "ka").unwrap();
    registry.remove_entry("ghost").unwrap();
    registry.remove_entry("a").unwrap();
    assert!(registry.entries().unwrap().is_empty());
}

#[test]
fn missing_or_null_payload_is_treated_as_empty() {
    let (store, registry) = registry();
    let mut record = SecretRecord {
        meta: ObjectMeta::named("mcp-mobile-keys"),
        data: BTreeMap::new(),
    };
    record.data.insert("apiKeys".to_string(), b"null".to_vec());
    store.create(record).unwrap();

    assert!(registry.entries().unwrap().is_empty());
    registry.add_entry("a", "ka").unwrap();
    assert_eq!(registry.lookup("a").unwrap().as_deref(), Some("ka"));
}

#[test]
fn corrupt_payload_is_a_codec_error() {
    let (store, registry) = registry();
    let mut record = SecretRecord {
        meta: ObjectMeta::named("mcp-mobile-keys"),
        data: BTreeMap::new(),
    };
    record.data.insert("apiKeys".to_string(), b"{broken".to_vec());
    store.create(record).unwrap();

    assert!(matches!(registry.add_entry("a", "ka"), Err(RegistryError::Codec(_))));
    assert!(matches!(registry.entries(), Err(RegistryError::Codec(_))));
}

#[test]
fn custom_registry_name_is_used() {
    let (store, registry) = registry();
    let registry = registry.with_name("tenant-keys");
    registry.add_entry("a", "ka").unwrap();
    assert!(store.get("tenant-keys").is_ok());
    assert!(store.get("mcp-mobile-keys").is_err());
}

#[test]
fn interleaved_write_between_read_and_update_is_not_lost() {
    let inner = InMemoryObjectStore::new();
    ApiKeyRegistry::new(Arc::new(inner.clone())).ensure_map_exists().unwrap();
    let store = Arc::new(InterleavingStore::new(
        inner.clone(),
        Box::new(|inner: &InMemoryObjectStore<SecretRecord>| {
            ApiKeyRegistry::new(Arc::new(inner.clone())).add_entry("b", "kb").unwrap();
        }),
    ));
    let registry = ApiKeyRegistry::new(store.clone());

    registry.add_entry("a", "ka").unwrap();

    let entries = registry.entries().unwrap();
    assert_eq!(entries.get("a").map(String::as_str), Some("ka"));
    assert_eq!(entries.get("b").map(String::as_str), Some("kb"));
    assert_eq!(store.updates.load(Ordering::SeqCst), 2);
}

#[test]
fn exhausted_retries_report_contention() {
    let store = Arc::new(AlwaysConflictStore::default());
    let registry = ApiKeyRegistry::new(store.clone()).with_max_attempts(3);
    registry.ensure_map_exists().unwrap();

    let err = registry.add_entry("a", "ka").unwrap_err();
    assert!(matches!(err, RegistryError::Contention { attempts: 3, .. }));
    assert_eq!(store.updates.load(Ordering::SeqCst), 3);
}

#[test]
fn concurrent_adds_against_empty_registry_keep_every_key() {
    let (_, registry) = registry();
    let registry = registry.with_max_attempts(1_000);
    let handles: Vec<_> = (0 .. 16)
        .map(|idx| {
            let registry = registry.clone();
            thread::spawn(move || registry.add_entry(&format!("app-{idx}"), &format!("key-{idx}")))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let entries = registry.entries().unwrap();
    assert_eq!(entries.len(), 16);
    for idx in 0 .. 16 {
        assert_eq!(entries.get(&format!("app-{idx}")), Some(&format!("key-{idx}")));
    }
}
