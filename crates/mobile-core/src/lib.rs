// crates/mobile-core/src/lib.rs
// ============================================================================
// Module: Mobile Core Library
// Description: Public API surface for the Mobile Core control plane.
// Purpose: Expose app types, store interfaces, and lifecycle runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Mobile Core tracks registered mobile application tenants, issues and
//! revokes their API keys, and keeps the shared key registry consistent under
//! concurrent writers. It is backend-agnostic: every persistent operation goes
//! through the [`ObjectStore`] contract, so hosts choose the storage engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AppValidator;
pub use interfaces::LabelSelector;
pub use interfaces::ObjectStore;
pub use interfaces::SharedConfigStore;
pub use interfaces::SharedSecretStore;
pub use interfaces::StoreError;
pub use interfaces::StoredRecord;
pub use interfaces::ValidationError;
pub use runtime::ApiKeyRegistry;
pub use runtime::AppLifecycleService;
pub use runtime::AppRepository;
pub use runtime::DefaultAppValidator;
pub use runtime::InMemoryObjectStore;
pub use runtime::LifecycleError;
pub use runtime::LifecycleStep;
pub use runtime::ReconcileReport;
pub use runtime::RegistryError;
pub use runtime::RepositoryError;
