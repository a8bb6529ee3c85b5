// crates/mobile-core/src/runtime/mod.rs
// ============================================================================
// Module: Mobile Core Runtime
// Description: App repository, API-key registry, and lifecycle orchestration.
// Purpose: Implement app tenant management over the object store contract.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the app lifecycle. The repository owns app
//! records, the registry owns the shared key map, and the lifecycle service
//! sequences both. None of them cache state across calls; every mutation
//! re-reads the store first.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod lifecycle;
pub mod registry;
pub mod repository;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use lifecycle::AppLifecycleService;
pub use lifecycle::LifecycleError;
pub use lifecycle::LifecycleStep;
pub use lifecycle::ReconcileReport;
pub use lifecycle::generate_api_key;
pub use registry::ApiKeyRegistry;
pub use registry::DEFAULT_MAX_UPDATE_ATTEMPTS;
pub use registry::DEFAULT_REGISTRY_NAME;
pub use registry::RegistryError;
pub use repository::AppRepository;
pub use repository::RepositoryError;
pub use store::InMemoryObjectStore;
pub use validator::DefaultAppValidator;
pub use validator::MAX_APP_NAME_LENGTH;
