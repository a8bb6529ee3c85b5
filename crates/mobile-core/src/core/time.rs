// crates/mobile-core/src/core/time.rs
// ============================================================================
// Module: Mobile Core Time Model
// Description: Clock abstraction and creation timestamp formatting.
// Purpose: Stamp app ids and creation metadata from an injectable clock.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Repositories read wall-clock time only through [`Clock`], so tests can pin
//! the instant used for app ids and `created` metadata. Timestamps are UTC.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Format of the `created` metadata value (`YYYY-MM-DD HH:MM:SS`).
pub const CREATED_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Formats an instant as a `created` metadata value.
///
/// # Errors
///
/// Returns [`time::error::Format`] when the instant cannot be rendered.
pub fn format_created(instant: OffsetDateTime) -> Result<String, time::error::Format> {
    instant.to_offset(time::UtcOffset::UTC).format(CREATED_TIMESTAMP_FORMAT)
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
