// crates/mobile-core-authz/src/check.rs
// ============================================================================
// Module: User Check
// Description: Token-to-user check used by the request gate.
// Purpose: Combine identity resolution and the permission review per token.
// Dependencies: none beyond crate internals
// ============================================================================

//! ## Overview
//! [`UserCheck`] is the seam the HTTP gate depends on. [`ClusterUserCheck`]
//! derives a token-scoped client from a shared base client for every call, so
//! no decision or credential is retained between requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::checker::PermissionChecker;
use crate::client::ClusterClient;
use crate::error::AuthzError;
use crate::user::ClusterUserRepo;
use crate::user::User;
use crate::user::UserRepo;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Validates a bearer token and returns the permitted user.
pub trait UserCheck: Send + Sync {
    /// Checks `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Authentication`] when the token is rejected or
    /// lacks permission; any other variant is an internal failure.
    fn check_user(&self, token: &str) -> Result<User, AuthzError>;
}

// ============================================================================
// SECTION: Cluster Check
// ============================================================================

/// [`UserCheck`] backed by the cluster API.
#[derive(Debug, Clone)]
pub struct ClusterUserCheck {
    /// Base client without a token.
    client: ClusterClient,
    /// Resource reviewed for the `update` verb.
    resource: String,
}

impl ClusterUserCheck {
    /// Creates a check reviewing `resource` in the client's namespace.
    #[must_use]
    pub fn new(client: ClusterClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
        }
    }
}

impl UserCheck for ClusterUserCheck {
    fn check_user(&self, token: &str) -> Result<User, AuthzError> {
        let scoped = self.client.with_token(token);
        let repo = ClusterUserRepo::new(scoped.clone());
        let user = repo.get_user()?;
        let namespace = scoped.config().namespace.clone();
        let checker = PermissionChecker::new(scoped, Arc::new(repo));
        if checker.review(&user, &self.resource, &namespace)? {
            Ok(user)
        } else {
            Err(AuthzError::Authentication {
                status: 403,
                message: format!("user {} may not update {}", user.username, self.resource),
            })
        }
    }
}
