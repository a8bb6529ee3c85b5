// crates/mobile-core-authz/src/error.rs
// ============================================================================
// Module: Authz Errors
// Description: Error type shared by cluster client, user repo, and checker.
// Purpose: Separate authentication failures from every other failure.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`AuthzError::Authentication`] is the only variant callers treat as
//! "caller not authenticated"; everything else is an internal failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authorization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// Cluster rejected the caller's credentials.
    #[error("authentication failed ({status}): {message}")]
    Authentication {
        /// HTTP status reported by the cluster.
        status: u16,
        /// Human-readable reason.
        message: String,
    },
    /// Cluster answered with an unexpected status.
    #[error("unexpected cluster response status {0}")]
    UnexpectedStatus(u16),
    /// Request could not be sent or completed.
    #[error("cluster transport error: {0}")]
    Transport(String),
    /// Request payload could not be encoded.
    #[error("cluster payload encoding error: {0}")]
    Encoding(String),
    /// Response body could not be read or decoded.
    #[error("cluster response body error: {0}")]
    Body(String),
    /// Client configuration is invalid.
    #[error("cluster client config error: {0}")]
    Config(String),
}

impl AuthzError {
    /// Returns true when the error means the caller is not authenticated.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
