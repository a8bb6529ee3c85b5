// crates/mobile-core-config/src/lib.rs
// ============================================================================
// Module: Mobile Core Config Library
// Description: Canonical config model, validation, and example payloads.
// Purpose: Single source of truth for mobile-core.toml semantics.
// Dependencies: mobile-core, mobile-core-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `mobile-core-config` defines the configuration model for the Mobile Core
//! server and CLI. Loading is strict and fail-closed: oversized files,
//! non-UTF-8 content, unknown enum values, and out-of-range limits are all
//! rejected before any component starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
