// crates/mobile-core/tests/common/mod.rs
// ============================================================================
// Module: Mobile Core Test Helpers
// Description: Shared fixtures for repository, registry, and lifecycle tests.
// Purpose: Provide pinned clocks and fault-injecting store wrappers.
// Dependencies: mobile-core, time
// ============================================================================

//! ## Overview
//! Helpers shared by the mobile-core integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use mobile_core::ApiKeyRegistry;
use mobile_core::AppLifecycleService;
use mobile_core::AppRepository;
use mobile_core::Clock;
use mobile_core::ConfigRecord;
use mobile_core::InMemoryObjectStore;
use mobile_core::LabelSelector;
use mobile_core::ObjectStore;
use mobile_core::SecretRecord;
use mobile_core::StoreError;
use time::OffsetDateTime;

/// Unix seconds used by [`FixedClock::default`].
pub const FIXED_UNIX: i64 = 1_700_000_000;

/// Clock pinned to one instant.
pub struct FixedClock(pub OffsetDateTime);

impl Default for FixedClock {
    fn default() -> Self {
        Self(OffsetDateTime::from_unix_timestamp(FIXED_UNIX).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// In-memory stores plus a lifecycle service wired over them.
pub struct Harness {
    pub configs: InMemoryObjectStore<ConfigRecord>,
    pub secrets: InMemoryObjectStore<SecretRecord>,
    pub service: AppLifecycleService,
}

/// Builds a lifecycle service over fresh in-memory stores.
pub fn harness() -> Harness {
    let configs = InMemoryObjectStore::new();
    let secrets = InMemoryObjectStore::new();
    let repository = AppRepository::new(Arc::new(configs.clone()));
    let registry = ApiKeyRegistry::new(Arc::new(secrets.clone()));
    Harness {
        configs,
        secrets,
        service: AppLifecycleService::new(repository, registry),
    }
}

/// Secret store that rejects every write with an I/O error.
#[derive(Default)]
pub struct FailingSecretStore {
    pub inner: InMemoryObjectStore<SecretRecord>,
}

impl ObjectStore<SecretRecord> for FailingSecretStore {
    fn get(&self, name: &str) -> Result<SecretRecord, StoreError> {
        self.inner.get(name)
    }

    fn create(&self, _record: SecretRecord) -> Result<SecretRecord, StoreError> {
        Err(StoreError::Io("injected create failure".to_string()))
    }

    fn update(&self, _record: SecretRecord) -> Result<SecretRecord, StoreError> {
        Err(StoreError::Io("injected update failure".to_string()))
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<SecretRecord>, StoreError> {
        self.inner.list(selector)
    }
}

/// Hook run against the inner store before an update is applied.
type UpdateHook = Box<dyn FnOnce(&InMemoryObjectStore<SecretRecord>) + Send>;

/// Secret store that runs a hook between a caller's read and its write.
pub struct InterleavingStore {
    pub inner: InMemoryObjectStore<SecretRecord>,
    hook: Mutex<Option<UpdateHook>>,
    pub updates: AtomicUsize,
}

impl InterleavingStore {
    /// Wraps a store; `hook` runs once, before the first update.
    pub fn new(inner: InMemoryObjectStore<SecretRecord>, hook: UpdateHook) -> Self {
        Self {
            inner,
            hook: Mutex::new(Some(hook)),
            updates: AtomicUsize::new(0),
        }
    }
}

impl ObjectStore<SecretRecord> for InterleavingStore {
    fn get(&self, name: &str) -> Result<SecretRecord, StoreError> {
        self.inner.get(name)
    }

    fn create(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let hook = self.hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        self.inner.update(record)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<SecretRecord>, StoreError> {
        self.inner.list(selector)
    }
}

/// Secret store whose updates always report a version conflict.
#[derive(Default)]
pub struct AlwaysConflictStore {
    pub inner: InMemoryObjectStore<SecretRecord>,
    pub updates: AtomicUsize,
}

impl ObjectStore<SecretRecord> for AlwaysConflictStore {
    fn get(&self, name: &str) -> Result<SecretRecord, StoreError> {
        self.inner.get(name)
    }

    fn create(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, record: SecretRecord) -> Result<SecretRecord, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict(record.meta.name))
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<SecretRecord>, StoreError> {
        self.inner.list(selector)
    }
}

/// When a [`ListHookStore`] hook runs relative to the listing it intercepts.
#[derive(Clone, Copy)]
pub enum ListHookTiming {
    /// Run the hook, then list.
    BeforeList,
    /// List, run the hook, then return the earlier listing.
    AfterList,
}

/// Hook run once while an app listing is in flight.
type ListHook = Box<dyn FnOnce() + Send>;

/// Config store that runs a hook once during the first listing.
pub struct ListHookStore {
    pub inner: InMemoryObjectStore<ConfigRecord>,
    hook: Mutex<Option<ListHook>>,
    timing: ListHookTiming,
}

impl ListHookStore {
    /// Wraps a store; `hook` runs once, during the first `list` call.
    pub fn new(
        inner: InMemoryObjectStore<ConfigRecord>,
        timing: ListHookTiming,
        hook: ListHook,
    ) -> Self {
        Self {
            inner,
            hook: Mutex::new(Some(hook)),
            timing,
        }
    }

    fn run_hook(&self) {
        let hook = self.hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl ObjectStore<ConfigRecord> for ListHookStore {
    fn get(&self, name: &str) -> Result<ConfigRecord, StoreError> {
        self.inner.get(name)
    }

    fn create(&self, record: ConfigRecord) -> Result<ConfigRecord, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, record: ConfigRecord) -> Result<ConfigRecord, StoreError> {
        self.inner.update(record)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<ConfigRecord>, StoreError> {
        match self.timing {
            ListHookTiming::BeforeList => {
                self.run_hook();
                self.inner.list(selector)
            }
            ListHookTiming::AfterList => {
                let listed = self.inner.list(selector);
                self.run_hook();
                listed
            }
        }
    }
}
