// crates/mobile-core-api/src/server.rs
// ============================================================================
// Module: Mobile Core Server
// Description: Builds the lifecycle stack from configuration and serves it.
// Purpose: Wire stores, registry, cluster check, gate, and router together.
// Dependencies: axum, axum-server, mobile-core, mobile-core-authz,
//               mobile-core-config, mobile-core-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`MobileCoreServer::from_config`] performs every blocking setup step
//! (opening `SQLite`, building the blocking cluster client) so it must run
//! outside an async context or on the blocking pool. [`MobileCoreServer::serve`]
//! binds the listener and serves plain HTTP or, when `[server.tls]` is set,
//! HTTPS through `axum-server`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use mobile_core::ApiKeyRegistry;
use mobile_core::AppLifecycleService;
use mobile_core::AppRepository;
use mobile_core::ConfigRecord;
use mobile_core::InMemoryObjectStore;
use mobile_core::SecretRecord;
use mobile_core::SharedConfigStore;
use mobile_core::SharedSecretStore;
use mobile_core_authz::ClusterClient;
use mobile_core_authz::ClusterClientConfig;
use mobile_core_authz::ClusterUserCheck;
use mobile_core_authz::UserCheck;
use mobile_core_config::MobileCoreConfig;
use mobile_core_config::StoreType;
use mobile_core_store_sqlite::SqliteDatabase;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::audit::StderrAuditSink;
use crate::gate::AccessGate;
use crate::gate::ExemptionList;
use crate::gate::TokenSources;
use crate::handlers::AppState;
use crate::handlers::router;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server setup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error("server config error: {0}")]
    Config(String),
    /// A component failed to initialize.
    #[error("server init error: {0}")]
    Init(String),
    /// Listener or connection handling failed.
    #[error("server transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Mobile core HTTP server.
pub struct MobileCoreServer {
    /// Validated configuration.
    config: MobileCoreConfig,
    /// Router with gate and handlers installed.
    router: Router,
}

impl MobileCoreServer {
    /// Builds the server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a component
    /// cannot be initialized.
    pub fn from_config(config: MobileCoreConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let lifecycle = build_lifecycle(&config)?;
        let audit = build_audit_sink(&config)?;
        let client = ClusterClient::new(cluster_client_config(&config))
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let check = Arc::new(ClusterUserCheck::new(client, config.cluster.resource.clone()));
        emit_security_warnings(&config, audit.as_ref());
        Self::from_parts(config, lifecycle, check, audit)
    }

    /// Builds the server from already constructed components.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the gate cannot be built.
    pub fn from_parts(
        config: MobileCoreConfig,
        lifecycle: AppLifecycleService,
        check: Arc<dyn UserCheck>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        let exemptions =
            ExemptionList::standard().map_err(|err| ServerError::Config(err.to_string()))?;
        let tokens = TokenSources::from_header_names(&config.server.token_headers)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let gate = AccessGate::new(exemptions, tokens, check, Arc::clone(&audit));
        let state = AppState::new(lifecycle, audit);
        let router = router(state, gate, config.server.max_body_bytes);
        Ok(Self {
            config,
            router,
        })
    }

    /// Returns a clone of the router.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        if let Some(tls) = &self.config.server.tls {
            let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|err| ServerError::Init(format!("tls config failed: {err}")))?;
            return axum_server::bind_rustls(addr, rustls)
                .serve(self.router.into_make_service())
                .await
                .map_err(|err| ServerError::Transport(format!("https server failed: {err}")));
        }
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        axum::serve(listener, self.router)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the lifecycle service over the configured stores.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the `SQLite` database cannot be opened.
pub fn build_lifecycle(config: &MobileCoreConfig) -> Result<AppLifecycleService, ServerError> {
    let (apps, secrets) = match config.store.store_type {
        StoreType::Memory => {
            let apps: SharedConfigStore = Arc::new(InMemoryObjectStore::<ConfigRecord>::new());
            let secrets: SharedSecretStore = Arc::new(InMemoryObjectStore::<SecretRecord>::new());
            (apps, secrets)
        }
        StoreType::Sqlite => {
            let sqlite = config
                .store
                .sqlite_config()
                .ok_or_else(|| ServerError::Config("sqlite store requires a path".to_string()))?;
            let database =
                SqliteDatabase::open(&sqlite).map_err(|err| ServerError::Init(err.to_string()))?;
            let apps: SharedConfigStore = Arc::new(database.store::<ConfigRecord>());
            let secrets: SharedSecretStore = Arc::new(database.store::<SecretRecord>());
            (apps, secrets)
        }
    };
    let repository = AppRepository::new(apps);
    let registry = ApiKeyRegistry::new(secrets)
        .with_name(config.registry.name.clone())
        .with_max_attempts(config.registry.max_update_attempts);
    Ok(AppLifecycleService::new(repository, registry))
}

/// Maps cluster configuration onto the client config.
fn cluster_client_config(config: &MobileCoreConfig) -> ClusterClientConfig {
    let cluster = &config.cluster;
    ClusterClientConfig {
        skip_tls_verify: cluster.skip_tls_verify,
        connect_timeout_ms: cluster.connect_timeout_ms,
        request_timeout_ms: cluster.request_timeout_ms,
        max_response_bytes: cluster.max_response_bytes,
        ..ClusterClientConfig::new(cluster.host.clone(), cluster.namespace.clone())
    }
}

/// Builds the configured audit sink.
fn build_audit_sink(config: &MobileCoreConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    let audit = &config.server.audit;
    if !audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Records warnings for weakened security settings.
fn emit_security_warnings(config: &MobileCoreConfig, audit: &dyn AuditSink) {
    if config.cluster.skip_tls_verify {
        audit.record_security(&SecurityAuditEvent::new(
            "skip_tls_verify",
            format!("cluster TLS verification disabled for {}", config.cluster.host),
        ));
    }
    let loopback = config.server.bind_addr().is_ok_and(|addr| addr.ip().is_loopback());
    if config.server.tls.is_none() && !loopback {
        audit.record_security(&SecurityAuditEvent::new(
            "plaintext_listener",
            format!("serving plain HTTP on non-loopback address {}", config.server.bind),
        ));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use mobile_core_config::MobileCoreConfig;

    use super::build_lifecycle;
    use super::cluster_client_config;

    #[test]
    fn cluster_settings_flow_into_client_config() {
        let config = MobileCoreConfig::from_toml_str(
            r#"
[cluster]
host = "https://cluster.example:8443"
namespace = "mobile"
skip_tls_verify = true
request_timeout_ms = 1500
"#,
        )
        .unwrap();
        let client = cluster_client_config(&config);
        assert_eq!(client.host, "https://cluster.example:8443");
        assert_eq!(client.namespace, "mobile");
        assert!(client.skip_tls_verify);
        assert_eq!(client.request_timeout_ms, 1500);
        assert!(client.token.is_empty());
    }

    #[test]
    fn memory_store_lifecycle_uses_configured_registry_name() {
        let config = MobileCoreConfig::from_toml_str(
            r#"
[registry]
name = "custom-keys"
"#,
        )
        .unwrap();
        let lifecycle = build_lifecycle(&config).unwrap();
        assert_eq!(lifecycle.registry().name(), "custom-keys");
    }
}
