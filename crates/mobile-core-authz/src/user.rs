// crates/mobile-core-authz/src/user.rs
// ============================================================================
// Module: Cluster Users
// Description: Resolves the identity behind a bearer token.
// Purpose: Provide the user and group list for access decisions.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`ClusterUserRepo`] asks the cluster who owns the client's token
//! (`GET /oapi/v1/users/~`). A 401 or 403 means the token is not accepted and
//! maps to [`AuthzError::Authentication`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;

use crate::client::ClusterClient;
use crate::error::AuthzError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path of the "current user" endpoint.
const CURRENT_USER_PATH: &str = "/oapi/v1/users/~";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cluster user identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User name.
    pub username: String,
    /// Group memberships.
    pub groups: Vec<String>,
}

impl User {
    /// Returns true when the user belongs to any of `groups`.
    #[must_use]
    pub fn in_any_group(&self, groups: &[String]) -> bool {
        self.groups.iter().any(|group| groups.contains(group))
    }
}

/// Resolves the current user.
pub trait UserRepo: Send + Sync {
    /// Returns the user owning the repository's credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError`] when the identity cannot be resolved.
    fn get_user(&self) -> Result<User, AuthzError>;
}

/// Wire shape of the cluster user object.
#[derive(Debug, Deserialize)]
struct UserPayload {
    /// Object metadata.
    #[serde(default)]
    metadata: UserMetadata,
    /// Group list; `null` is treated as empty.
    #[serde(default)]
    groups: Option<Vec<String>>,
}

/// Wire shape of the user metadata block.
#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    /// User name.
    #[serde(default)]
    name: String,
}

// ============================================================================
// SECTION: Cluster Repo
// ============================================================================

/// [`UserRepo`] backed by the cluster API.
#[derive(Debug, Clone)]
pub struct ClusterUserRepo {
    /// Token-scoped client.
    client: ClusterClient,
}

impl ClusterUserRepo {
    /// Creates a repo using `client` (and its token).
    #[must_use]
    pub const fn new(client: ClusterClient) -> Self {
        Self {
            client,
        }
    }
}

impl UserRepo for ClusterUserRepo {
    fn get_user(&self) -> Result<User, AuthzError> {
        let response = self.client.send(Method::GET, CURRENT_USER_PATH, None)?;
        match response.status {
            200 => {}
            401 | 403 => {
                return Err(AuthzError::Authentication {
                    status: response.status,
                    message: "token rejected by cluster".to_string(),
                });
            }
            other => return Err(AuthzError::UnexpectedStatus(other)),
        }
        let payload: UserPayload = serde_json::from_slice(&response.body)
            .map_err(|err| AuthzError::Body(format!("invalid user payload: {err}")))?;
        if payload.metadata.name.is_empty() {
            return Err(AuthzError::Body("user payload has no name".to_string()));
        }
        Ok(User {
            username: payload.metadata.name,
            groups: payload.groups.unwrap_or_default(),
        })
    }
}
