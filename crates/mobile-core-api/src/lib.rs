// crates/mobile-core-api/src/lib.rs
// ============================================================================
// Module: Mobile Core API Library
// Description: HTTP surface for the mobile app control plane.
// Purpose: Gate admin requests and expose app lifecycle operations over HTTP.
// Dependencies: axum, axum-server, mobile-core, mobile-core-authz, tokio
// ============================================================================

//! ## Overview
//! The API crate wires the lifecycle service into an axum router. Every
//! request passes through the [`AccessGate`] first; exempt routes (health,
//! SDK config) skip the cluster check, all other routes require a bearer
//! token the cluster accepts. Store and cluster calls are blocking and run on
//! tokio's blocking pool.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod gate;
pub mod handlers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::GateAuditEvent;
pub use audit::GateDecision;
pub use audit::LifecycleAction;
pub use audit::LifecycleAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::SecurityAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::token_fingerprint;
pub use gate::AccessGate;
pub use gate::DEFAULT_EXEMPTIONS;
pub use gate::ExemptionList;
pub use gate::GateError;
pub use gate::TokenSource;
pub use gate::TokenSources;
pub use handlers::API_KEY_HEADER;
pub use handlers::ApiError;
pub use handlers::AppState;
pub use handlers::router;
pub use server::MobileCoreServer;
pub use server::ServerError;
pub use server::build_lifecycle;
