// crates/mobile-core-api/tests/common/mod.rs
// ============================================================================
// Module: API Test Support
// Description: Background axum server, fake user check, and audit recorder.
// Purpose: Drive the HTTP surface end to end with reqwest::blocking.
// Dependencies: mobile-core, mobile-core-api, mobile-core-authz, tokio
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are not used by every test binary.")]

use std::collections::BTreeMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use mobile_core::ApiKeyRegistry;
use mobile_core::AppLifecycleService;
use mobile_core::AppRepository;
use mobile_core::InMemoryObjectStore;
use mobile_core::LabelSelector;
use mobile_core::ObjectStore;
use mobile_core::SecretRecord;
use mobile_core::StoreError;
use mobile_core_api::AuditSink;
use mobile_core_api::GateAuditEvent;
use mobile_core_api::LifecycleAuditEvent;
use mobile_core_api::MobileCoreServer;
use mobile_core_authz::AuthzError;
use mobile_core_authz::User;
use mobile_core_authz::UserCheck;
use mobile_core_config::MobileCoreConfig;
use serde_json::Value;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Fakes
// ============================================================================

/// Token accepted by [`FakeUserCheck`].
pub const ADMIN_TOKEN: &str = "admin-token";
/// Token rejected as unauthenticated.
pub const REJECTED_TOKEN: &str = "rejected-token";
/// Token whose check fails with a transport error.
pub const BROKEN_TOKEN: &str = "broken-token";

/// User check answering from a fixed token table.
#[derive(Default)]
pub struct FakeUserCheck {
    pub calls: Mutex<Vec<String>>,
}

impl UserCheck for FakeUserCheck {
    fn check_user(&self, token: &str) -> Result<User, AuthzError> {
        self.calls.lock().unwrap().push(token.to_string());
        match token {
            ADMIN_TOKEN => Ok(User {
                username: "admin".to_string(),
                groups: vec!["mobile-admins".to_string()],
            }),
            BROKEN_TOKEN => Err(AuthzError::Transport("connection refused".to_string())),
            _ => Err(AuthzError::Authentication {
                status: 401,
                message: "token rejected".to_string(),
            }),
        }
    }
}

/// Audit sink keeping every event as JSON.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub gate: Mutex<Vec<Value>>,
    pub lifecycle: Mutex<Vec<Value>>,
}

impl AuditSink for RecordingAuditSink {
    fn record_gate(&self, event: &GateAuditEvent) {
        self.gate.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.lifecycle.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

/// Secret store whose writes fail while `failing` is set.
#[derive(Clone, Default)]
pub struct ToggleSecretStore {
    pub inner: InMemoryObjectStore<SecretRecord>,
    pub failing: Arc<AtomicBool>,
}

impl ToggleSecretStore {
    fn guard(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Io("secret store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ObjectStore<SecretRecord> for ToggleSecretStore {
    fn get(&self, name: &str) -> Result<SecretRecord, StoreError> {
        self.inner.get(name)
    }

    fn create(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.guard()?;
        self.inner.create(record)
    }

    fn update(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.guard()?;
        self.inner.update(record)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.guard()?;
        self.inner.delete(name)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<SecretRecord>, StoreError> {
        self.inner.list(selector)
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Running test server.
pub struct TestServer {
    pub base_url: String,
    pub check: Arc<FakeUserCheck>,
    pub audit: Arc<RecordingAuditSink>,
    pub secrets: ToggleSecretStore,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Blocking client for the server.
    pub fn client(&self) -> reqwest::blocking::Client {
        reqwest::blocking::Client::new()
    }

    /// Recorded gate events.
    pub fn gate_events(&self) -> Vec<Value> {
        self.audit.gate.lock().unwrap().clone()
    }

    /// Recorded lifecycle events.
    pub fn lifecycle_events(&self) -> Vec<Value> {
        self.audit.lifecycle.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Starts a server over in-memory stores with default configuration.
pub fn spawn_server() -> TestServer {
    spawn_server_with(MobileCoreConfig::default())
}

/// Starts a server over in-memory stores with `config`.
pub fn spawn_server_with(config: MobileCoreConfig) -> TestServer {
    let secrets = ToggleSecretStore::default();
    let repository = AppRepository::new(Arc::new(InMemoryObjectStore::new()));
    let registry = ApiKeyRegistry::new(Arc::new(secrets.clone()));
    let lifecycle = AppLifecycleService::new(repository, registry);
    let check = Arc::new(FakeUserCheck::default());
    let audit = Arc::new(RecordingAuditSink::default());
    let server = MobileCoreServer::from_parts(
        config,
        lifecycle,
        Arc::clone(&check) as Arc<dyn UserCheck>,
        Arc::clone(&audit) as Arc<dyn AuditSink>,
    )
    .unwrap();
    let app = server.router();

    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = thread::spawn(move || {
        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    TestServer {
        base_url: format!("http://{addr}"),
        check,
        audit,
        secrets,
        shutdown: Some(shutdown_tx),
        join: Some(join),
    }
}

/// JSON body for creating an app.
pub fn create_body(name: &str, client_type: &str) -> Value {
    serde_json::json!({ "name": name, "clientType": client_type })
}

/// Labels map helper.
pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}
