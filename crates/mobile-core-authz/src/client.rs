// crates/mobile-core-authz/src/client.rs
// ============================================================================
// Module: Cluster Client
// Description: Blocking HTTP client for the cluster API.
// Purpose: Send bounded, token-scoped JSON requests to the cluster.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! [`ClusterClientConfig`] is a plain value: `with_token` and
//! `with_namespace` return new values and never touch shared state, so one
//! startup client can be specialised per request without locking. The
//! underlying HTTP connection pool is shared between all derived clients.
//!
//! Requests never follow redirects, carry connect and request timeouts, and
//! read at most `max_response_bytes` of any response body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use crate::error::AuthzError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User agent sent with cluster requests.
const USER_AGENT: &str = "mobile-core-authz/0.1";
/// Default connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Default request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default maximum response body size in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Connection settings for the cluster API.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterClientConfig {
    /// Base URL (`https://host[:port]`).
    pub host: String,
    /// Namespace used for namespaced calls.
    pub namespace: String,
    /// Caller bearer token; empty when unauthenticated.
    pub token: String,
    /// Accept invalid TLS certificates.
    pub skip_tls_verify: bool,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
}

impl ClusterClientConfig {
    /// Creates a config for `host` and `namespace` with default limits.
    #[must_use]
    pub fn new(host: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            namespace: namespace.into(),
            token: String::new(),
            skip_tls_verify: false,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Returns a copy carrying `token`.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }

    /// Returns a copy targeting `namespace`.
    #[must_use]
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ClusterClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterClientConfig")
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("token", &if self.token.is_empty() { "<none>" } else { "<redacted>" })
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Raw cluster response.
#[derive(Debug, Clone)]
pub struct ClusterResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, bounded by `max_response_bytes`.
    pub body: Vec<u8>,
}

/// Token-scoped cluster API client.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    /// Connection settings.
    config: ClusterClientConfig,
    /// Shared HTTP client.
    http: Client,
}

impl ClusterClient {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Config`] when the host is unusable or the HTTP
    /// client cannot be created.
    pub fn new(config: ClusterClientConfig) -> Result<Self, AuthzError> {
        let host = config.host.trim();
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(AuthzError::Config(format!(
                "cluster host must start with http:// or https://: {host}"
            )));
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(|err| AuthzError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            http,
        })
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn config(&self) -> &ClusterClientConfig {
        &self.config
    }

    /// Returns a client carrying `token`, sharing the connection pool.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            config: self.config.with_token(token),
            http: self.http.clone(),
        }
    }

    /// Returns a client targeting `namespace`, sharing the connection pool.
    #[must_use]
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            config: self.config.with_namespace(namespace),
            http: self.http.clone(),
        }
    }

    /// Sends a request to `path` (which must start with `/`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Transport`] when the request fails and
    /// [`AuthzError::Body`] when the response body cannot be read in bounds.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ClusterResponse, AuthzError> {
        let url = format!("{}{path}", self.config.host.trim().trim_end_matches('/'));
        let mut request = self.http.request(method, url);
        if !self.config.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("bearer {}", self.config.token));
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let mut response = request.send().map_err(|err| AuthzError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        Ok(ClusterResponse {
            status,
            body,
        })
    }
}

/// Validates a value used as a single URL path segment.
pub(crate) fn validate_segment(field: &str, value: &str) -> Result<(), AuthzError> {
    if value.is_empty()
        || !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
    {
        return Err(AuthzError::Config(format!("invalid {field}: `{value}`")));
    }
    Ok(())
}

/// Reads a response body while enforcing a maximum size.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, AuthzError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| AuthzError::Body("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(AuthzError::Body("cluster response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|err| AuthzError::Body(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(AuthzError::Body("cluster response exceeds size limit".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
