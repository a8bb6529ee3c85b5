// crates/mobile-core-authz/src/lib.rs
// ============================================================================
// Module: Mobile Core Authz Library
// Description: Cluster user resolution and local resource access reviews.
// Purpose: Decide whether a bearer token may administer mobile apps.
// Dependencies: reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate talks to the cluster API on behalf of a caller. It resolves the
//! caller's identity from their token, asks the cluster which users and
//! groups may update a resource in a namespace, and reduces the answer to a
//! single allow/deny decision. Transport, status, and decoding failures are
//! always errors; only an explicit cluster answer ever produces a denial.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod check;
pub mod checker;
pub mod client;
pub mod error;
pub mod user;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use check::ClusterUserCheck;
pub use check::UserCheck;
pub use checker::PermissionChecker;
pub use client::ClusterClient;
pub use client::ClusterClientConfig;
pub use error::AuthzError;
pub use user::ClusterUserRepo;
pub use user::User;
pub use user::UserRepo;
