// crates/mobile-core/src/runtime/validator.rs
// ============================================================================
// Module: Mobile Core App Validator
// Description: Default validation rules for app creation and update.
// Purpose: Keep app names usable as record names and ids immutable.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The default validator requires app names that remain valid record names
//! once the `-<unix seconds>` id suffix is appended, and rejects updates
//! that try to change an existing app id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::App;
use crate::interfaces::AppValidator;
use crate::interfaces::ValidationError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum record name length accepted by object stores.
const MAX_RECORD_NAME_LENGTH: usize = 253;
/// Length reserved for the `-<unix seconds>` id suffix.
const ID_SUFFIX_LENGTH: usize = 11;
/// Maximum app name length.
pub const MAX_APP_NAME_LENGTH: usize = MAX_RECORD_NAME_LENGTH - ID_SUFFIX_LENGTH;

// ============================================================================
// SECTION: Default Validator
// ============================================================================

/// Default [`AppValidator`] implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAppValidator;

impl AppValidator for DefaultAppValidator {
    fn pre_create(&self, app: &App) -> Result<(), ValidationError> {
        validate_name(&app.name)
    }

    fn pre_update(&self, old: &App, new: &App) -> Result<(), ValidationError> {
        if !new.id.is_empty() && new.id != old.id {
            return Err(ValidationError::InvalidField {
                field: "id",
                reason: format!("app id is immutable (stored {}, got {})", old.id, new.id),
            });
        }
        validate_name(&new.name)
    }
}

/// Validates an app name as a lowercase DNS-style label.
fn validate_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidField {
        field: "name",
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("must be non-empty"));
    }
    if name.len() > MAX_APP_NAME_LENGTH {
        return Err(invalid(&format!("exceeds {MAX_APP_NAME_LENGTH} characters")));
    }
    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(invalid("must contain only lowercase letters, digits, and '-'"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
