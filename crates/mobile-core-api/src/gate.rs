// crates/mobile-core-api/src/gate.rs
// ============================================================================
// Module: Access Gate
// Description: Request middleware enforcing cluster-backed access control.
// Purpose: Admit only exempt routes or callers the cluster allows.
// Dependencies: axum, regex, mobile-core-authz, tokio
// ============================================================================

//! ## Overview
//! For every request the gate extracts a token, checks the `METHOD:path` key
//! against the exemption list, and otherwise asks the injected
//! [`UserCheck`] whether the token's owner may administer apps.
//!
//! # Invariants
//! - Exemption patterns are compiled once and never change afterwards.
//! - An authentication failure is a 401; every other check failure is a 500.
//! - No decision is cached between requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use mobile_core_authz::AuthzError;
use mobile_core_authz::UserCheck;
use regex::Regex;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::GateAuditEvent;
use crate::audit::GateDecision;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of a token-bearing header value.
const MAX_TOKEN_HEADER_BYTES: usize = 8 * 1024;

/// Routes that never require a token, as anchored `METHOD:path` patterns.
pub const DEFAULT_EXEMPTIONS: &[&str] = &[
    r"^GET:/config\.js$",
    r"^GET:/sdk/mobileapp/[^/]+/config$",
    r"^GET:/sys/info/ping$",
    r"^GET:/sys/info/health$",
    r"^GET:/metrics$",
    r"^GET:/build/[^/]+/download$",
];

/// Header carrying the token forwarded by an OAuth proxy.
const FORWARDED_TOKEN_HEADER: &str = "x-forwarded-access-token";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate construction errors.
#[derive(Debug, Error)]
pub enum GateError {
    /// Exemption pattern failed to compile.
    #[error("invalid exemption pattern {pattern}: {message}")]
    Pattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// Token header name is not a valid HTTP header name.
    #[error("invalid token header name: {0}")]
    TokenHeader(String),
}

// ============================================================================
// SECTION: Exemptions
// ============================================================================

/// Compiled list of exempt `METHOD:path` patterns.
#[derive(Debug, Clone)]
pub struct ExemptionList {
    /// Compiled patterns.
    patterns: Vec<Regex>,
}

impl ExemptionList {
    /// Compiles `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Pattern`] when a pattern does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, GateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|err| GateError::Pattern {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
        })
    }

    /// Compiles [`DEFAULT_EXEMPTIONS`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Pattern`] when a default pattern does not compile.
    pub fn standard() -> Result<Self, GateError> {
        Self::new(DEFAULT_EXEMPTIONS)
    }

    /// Returns true when `method` and `path` match an exemption.
    #[must_use]
    pub fn is_exempt(&self, method: &str, path: &str) -> bool {
        let key = format!("{method}:{path}");
        self.patterns.iter().any(|pattern| pattern.is_match(&key))
    }
}

// ============================================================================
// SECTION: Token Sources
// ============================================================================

/// Where a caller token may be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// `Bearer <token>` in the named header.
    Bearer(HeaderName),
    /// Entire value of the named header.
    Raw(HeaderName),
}

impl TokenSource {
    /// Extracts a token from `headers`, if present and well formed.
    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let (name, bearer) = match self {
            Self::Bearer(name) => (name, true),
            Self::Raw(name) => (name, false),
        };
        let value = headers.get(name)?.to_str().ok()?;
        if value.len() > MAX_TOKEN_HEADER_BYTES {
            return None;
        }
        let token = if bearer {
            let mut parts = value.trim().splitn(2, ' ');
            let scheme = parts.next().unwrap_or_default();
            if !scheme.eq_ignore_ascii_case("bearer") {
                return None;
            }
            parts.next().unwrap_or_default().trim()
        } else {
            value.trim()
        };
        if token.is_empty() { None } else { Some(token.to_string()) }
    }
}

/// Ordered token sources; the first source yielding a token wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSources {
    /// Sources in lookup order.
    sources: Vec<TokenSource>,
}

impl TokenSources {
    /// Builds sources from header names; `authorization` is parsed as a
    /// bearer header and any other header is read raw.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::TokenHeader`] for an invalid header name.
    pub fn from_header_names(names: &[String]) -> Result<Self, GateError> {
        let sources = names
            .iter()
            .map(|name| {
                let header = HeaderName::from_bytes(name.trim().as_bytes())
                    .map_err(|_| GateError::TokenHeader(name.clone()))?;
                if header == AUTHORIZATION {
                    Ok(TokenSource::Bearer(header))
                } else {
                    Ok(TokenSource::Raw(header))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sources,
        })
    }

    /// `Authorization: Bearer`, then `X-Forwarded-Access-Token`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            sources: vec![
                TokenSource::Bearer(AUTHORIZATION),
                TokenSource::Raw(HeaderName::from_static(FORWARDED_TOKEN_HEADER)),
            ],
        }
    }

    /// Returns the first token found in `headers`.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        self.sources.iter().find_map(|source| source.extract(headers))
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Access gate shared by every request.
#[derive(Clone)]
pub struct AccessGate {
    /// Exempt routes.
    exemptions: Arc<ExemptionList>,
    /// Token lookup order.
    tokens: Arc<TokenSources>,
    /// Cluster user check.
    check: Arc<dyn UserCheck>,
    /// Audit sink for gate decisions.
    audit: Arc<dyn AuditSink>,
}

impl AccessGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(
        exemptions: ExemptionList,
        tokens: TokenSources,
        check: Arc<dyn UserCheck>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            exemptions: Arc::new(exemptions),
            tokens: Arc::new(tokens),
            check,
            audit,
        }
    }

    /// Returns the exemption list.
    #[must_use]
    pub fn exemptions(&self) -> &ExemptionList {
        &self.exemptions
    }
}

/// axum middleware applying the gate.
pub async fn enforce(State(gate): State<AccessGate>, mut request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let token = gate.tokens.extract(request.headers());
    if gate.exemptions.is_exempt(&method, &path) {
        gate.audit.record_gate(&GateAuditEvent::new(&method, &path, GateDecision::Exempt));
        return next.run(request).await;
    }
    let Some(token) = token else {
        let event = GateAuditEvent::new(&method, &path, GateDecision::Deny)
            .rejected(StatusCode::UNAUTHORIZED.as_u16(), "no token provided");
        gate.audit.record_gate(&event);
        return (StatusCode::UNAUTHORIZED, "no token provided access denied").into_response();
    };

    let check = Arc::clone(&gate.check);
    let checked_token = token.clone();
    let outcome = tokio::task::spawn_blocking(move || check.check_user(&checked_token))
        .await
        .unwrap_or_else(|err| Err(AuthzError::Transport(format!("access check aborted: {err}"))));
    match outcome {
        Ok(user) => {
            let event = GateAuditEvent::new(&method, &path, GateDecision::Allow)
                .with_token(&token)
                .with_username(user.username.clone());
            gate.audit.record_gate(&event);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            let status = if err.is_authentication() {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let event = GateAuditEvent::new(&method, &path, GateDecision::Deny)
                .rejected(status.as_u16(), err.to_string())
                .with_token(&token);
            gate.audit.record_gate(&event);
            (status, err.to_string()).into_response()
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
