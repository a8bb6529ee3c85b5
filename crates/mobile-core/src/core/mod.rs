// crates/mobile-core/src/core/mod.rs
// ============================================================================
// Module: Mobile Core Types
// Description: App tenant model, stored record shapes, and time helpers.
// Purpose: Provide stable, serializable types shared by the runtime and hosts.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types define the App tenant record, the generic stored-record shapes
//! the object store persists, and the clock used to stamp creation metadata.
//! These types are the canonical source for the HTTP surface and the CLI.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod app;
pub mod record;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use app::APP_GROUP_LABEL;
pub use app::APP_GROUP_VALUE;
pub use app::APP_NAME_LABEL;
pub use app::App;
pub use app::ClientType;
pub use app::CREATED_METADATA_KEY;
pub use app::ICON_METADATA_KEY;
pub use record::ConfigRecord;
pub use record::ObjectMeta;
pub use record::SecretRecord;
pub use time::Clock;
pub use time::CREATED_TIMESTAMP_FORMAT;
pub use time::SystemClock;
pub use time::format_created;
