// crates/mobile-core-config/src/config.rs
// ============================================================================
// Module: Mobile Core Configuration
// Description: Configuration loading and validation for Mobile Core.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: mobile-core, mobile-core-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a loopback server over
//! an in-memory store. Invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use mobile_core::runtime::DEFAULT_MAX_UPDATE_ATTEMPTS;
use mobile_core::runtime::DEFAULT_REGISTRY_NAME;
use mobile_core_store_sqlite::SqliteStoreConfig;
use mobile_core_store_sqlite::SqliteStoreMode;
use mobile_core_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mobile-core.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MOBILE_CORE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `server.max_body_bytes`.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Upper bound for `cluster.max_response_bytes`.
pub(crate) const MAX_RESPONSE_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum number of token headers.
pub(crate) const MAX_TOKEN_HEADERS: usize = 8;
/// Maximum length of a token header name.
pub(crate) const MAX_HEADER_NAME_LENGTH: usize = 64;
/// Upper bound for cluster timeouts in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 120_000;
/// Upper bound for registry update attempts.
pub(crate) const MAX_UPDATE_ATTEMPTS_LIMIT: u32 = 1_000;
/// Maximum registry name length.
pub(crate) const MAX_REGISTRY_NAME_LENGTH: usize = 253;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Mobile Core configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobileCoreConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cluster authorization API configuration.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Object store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// API-key registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl MobileCoreConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `MOBILE_CORE_CONFIG`, then
    /// `mobile-core.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.cluster.validate()?;
        self.store.validate()?;
        self.registry.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Headers searched for the caller's token, in order.
    ///
    /// `authorization` is parsed as a bearer credential; any other header
    /// carries the raw token.
    #[serde(default = "default_token_headers")]
    pub token_headers: Vec<String>,
    /// Optional TLS configuration.
    #[serde(default)]
    pub tls: Option<ServerTlsConfig>,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            token_headers: default_token_headers(),
            tls: None,
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if self.token_headers.is_empty() {
            return Err(ConfigError::Invalid(
                "server.token_headers must list at least one header".to_string(),
            ));
        }
        if self.token_headers.len() > MAX_TOKEN_HEADERS {
            return Err(ConfigError::Invalid(format!(
                "server.token_headers exceeds {MAX_TOKEN_HEADERS} entries"
            )));
        }
        for header in &self.token_headers {
            validate_header_name(header)?;
        }
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        self.audit.validate()
    }
}

/// TLS configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerTlsConfig {
    /// Server certificate chain (PEM).
    pub cert_path: String,
    /// Server private key (PEM).
    pub key_path: String,
}

impl ServerTlsConfig {
    /// Validates TLS configuration paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("server.tls.cert_path", &self.cert_path)?;
        validate_path_string("server.tls.key_path", &self.key_path)
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Cluster Config
// ============================================================================

/// Cluster authorization API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster API (`https://host[:port]`).
    #[serde(default = "default_cluster_host")]
    pub host: String,
    /// Namespace permission checks run against.
    #[serde(default = "default_cluster_namespace")]
    pub namespace: String,
    /// Resource the caller must be allowed to update.
    #[serde(default = "default_cluster_resource")]
    pub resource: String,
    /// Disable TLS certificate verification for cluster calls.
    #[serde(default)]
    pub skip_tls_verify: bool,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum cluster response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_cluster_host(),
            namespace: default_cluster_namespace(),
            resource: default_cluster_resource(),
            skip_tls_verify: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::Invalid("cluster.host must be non-empty".to_string()));
        }
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "cluster.host must start with http:// or https://".to_string(),
            ));
        }
        validate_segment("cluster.namespace", &self.namespace)?;
        validate_segment("cluster.resource", &self.resource)?;
        for (field, value) in [
            ("cluster.connect_timeout_ms", self.connect_timeout_ms),
            ("cluster.request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 || value > MAX_TIMEOUT_MS {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be between 1 and {MAX_TIMEOUT_MS}"
                )));
            }
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "cluster.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Object store backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory store (lost on restart).
    #[default]
    Memory,
    /// `SQLite`-backed store.
    Sqlite,
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

// ============================================================================
// SECTION: Registry Config
// ============================================================================

/// API-key registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Registry record name.
    #[serde(default = "default_registry_name")]
    pub name: String,
    /// Read-modify-write attempts before reporting contention.
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: default_registry_name(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

impl RegistryConfig {
    /// Validates registry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > MAX_REGISTRY_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "registry.name must be 1 to {MAX_REGISTRY_NAME_LENGTH} characters"
            )));
        }
        if self.max_update_attempts == 0 || self.max_update_attempts > MAX_UPDATE_ATTEMPTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "registry.max_update_attempts must be between 1 and {MAX_UPDATE_ATTEMPTS_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an HTTP header name.
fn validate_header_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_HEADER_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "token header names must be 1 to {MAX_HEADER_NAME_LENGTH} characters"
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(ConfigError::Invalid(format!(
            "token header {name} must be lowercase letters, digits, or '-'"
        )));
    }
    Ok(())
}

/// Validates a value used as a single URL path segment.
fn validate_segment(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_PATH_COMPONENT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} must be 1 to 255 characters")));
    }
    if !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.') {
        return Err(ConfigError::Invalid(format!(
            "{field} must contain only letters, digits, '-', or '.'"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default token headers.
fn default_token_headers() -> Vec<String> {
    vec!["authorization".to_string(), "x-forwarded-access-token".to_string()]
}

/// Default audit logging enabled.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default cluster API host.
fn default_cluster_host() -> String {
    "https://openshift.default.svc".to_string()
}

/// Default namespace.
fn default_cluster_namespace() -> String {
    "default".to_string()
}

/// Default resource checked for update access.
fn default_cluster_resource() -> String {
    "deploymentconfigs".to_string()
}

/// Default connect timeout in milliseconds.
pub(crate) const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Default request timeout in milliseconds.
pub(crate) const fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Default maximum cluster response size in bytes.
pub(crate) const fn default_max_response_bytes() -> usize {
    1024 * 1024
}

/// Default store busy timeout in milliseconds.
pub(crate) const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default registry record name.
fn default_registry_name() -> String {
    DEFAULT_REGISTRY_NAME.to_string()
}

/// Default registry update attempts.
pub(crate) const fn default_max_update_attempts() -> u32 {
    DEFAULT_MAX_UPDATE_ATTEMPTS
}
