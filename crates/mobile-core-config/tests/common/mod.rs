// crates/mobile-core-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for mobile-core-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use mobile_core_config::ConfigError;
use mobile_core_config::MobileCoreConfig;

/// Parses and validates a TOML string.
pub fn load_str(toml_str: &str) -> Result<MobileCoreConfig, ConfigError> {
    MobileCoreConfig::from_toml_str(toml_str)
}

/// Asserts that a TOML string fails validation with a message fragment.
pub fn assert_invalid(toml_str: &str, fragment: &str) {
    match load_str(toml_str) {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains(fragment), "message {message:?} missing {fragment:?}");
        }
        other => panic!("expected invalid config containing {fragment:?}, got {other:?}"),
    }
}
