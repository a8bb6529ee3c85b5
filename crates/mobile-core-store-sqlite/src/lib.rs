// crates/mobile-core-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Object Store
// Description: Durable ObjectStore backend using SQLite WAL.
// Purpose: Provide production persistence for app and registry records.
// Dependencies: mobile-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`mobile_core::ObjectStore`]. One
//! database file holds every record kind; each kind is exposed as its own
//! typed store handle sharing a single connection. Updates are conditional
//! on the stored resource version, so concurrent writers see conflicts
//! instead of silently overwriting each other.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteDatabase;
pub use store::SqliteObjectStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
