// crates/mobile-core-authz/src/checker.rs
// ============================================================================
// Module: Permission Checker
// Description: Local resource access review against the cluster API.
// Purpose: Decide whether the caller may update a resource in a namespace.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The checker resolves the caller through a [`UserRepo`] and then asks the
//! cluster which users and groups may `update` the resource in the
//! namespace. The caller is allowed when their username, or any of their
//! groups, is listed.
//!
//! # Invariants
//! - Only an explicit 403 or a review that does not list the caller yields
//!   `Ok(false)`.
//! - Transport, status, and decoding failures are errors, never a denial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;

use crate::client::ClusterClient;
use crate::client::validate_segment;
use crate::error::AuthzError;
use crate::user::User;
use crate::user::UserRepo;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Verb checked by the review.
const REVIEW_VERB: &str = "update";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Access review request body.
#[derive(Debug, Serialize)]
struct AccessReviewRequest<'a> {
    /// Verb to review.
    verb: &'a str,
    /// Resource to review.
    resource: &'a str,
}

/// Access review response body.
#[derive(Debug, Deserialize)]
struct AccessReviewResponse {
    /// Users allowed to perform the verb; `null` is empty.
    #[serde(default)]
    users: Option<Vec<String>>,
    /// Groups allowed to perform the verb; `null` is empty.
    #[serde(default)]
    groups: Option<Vec<String>>,
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Cluster-backed permission checker.
#[derive(Clone)]
pub struct PermissionChecker {
    /// Token-scoped client.
    client: ClusterClient,
    /// Identity source.
    users: Arc<dyn UserRepo>,
}

impl PermissionChecker {
    /// Creates a checker.
    #[must_use]
    pub fn new(client: ClusterClient, users: Arc<dyn UserRepo>) -> Self {
        Self {
            client,
            users,
        }
    }

    /// Resolves the caller and reviews `resource` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError`] when the user cannot be resolved or the review
    /// fails.
    pub fn check(&self, resource: &str, namespace: &str) -> Result<bool, AuthzError> {
        let user = self.users.get_user()?;
        self.review(&user, resource, namespace)
    }

    /// Reviews whether `user` may update `resource` in `namespace`.
    ///
    /// `resource` is sent as-is in the review payload; the server passes the
    /// configured `cluster.resource`, which defaults to `deploymentconfigs`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Authentication`] on 401,
    /// [`AuthzError::UnexpectedStatus`] on any status other than 201 or 403,
    /// and encoding, transport, or body errors as they occur.
    pub fn review(&self, user: &User, resource: &str, namespace: &str) -> Result<bool, AuthzError> {
        validate_segment("namespace", namespace)?;
        let body = serde_json::to_vec(&AccessReviewRequest {
            verb: REVIEW_VERB,
            resource,
        })
        .map_err(|err| AuthzError::Encoding(err.to_string()))?;
        let path = format!("/oapi/v1/namespaces/{namespace}/localresourceaccessreviews");
        let response = self.client.send(Method::POST, &path, Some(body))?;
        match response.status {
            201 => {}
            403 => return Ok(false),
            401 => {
                return Err(AuthzError::Authentication {
                    status: 401,
                    message: "access review rejected credentials".to_string(),
                });
            }
            other => return Err(AuthzError::UnexpectedStatus(other)),
        }
        let review: AccessReviewResponse = serde_json::from_slice(&response.body)
            .map_err(|err| AuthzError::Body(format!("invalid access review: {err}")))?;
        let users = review.users.unwrap_or_default();
        if users.iter().any(|name| name == &user.username) {
            return Ok(true);
        }
        let groups = review.groups.unwrap_or_default();
        Ok(user.in_any_group(&groups))
    }
}
