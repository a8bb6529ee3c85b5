// crates/mobile-core/tests/lifecycle.rs
// ============================================================================
// Module: App Lifecycle Tests
// Description: End-to-end tests for app creation, deletion, and repair.
// Purpose: Validate key issuance, partial-failure surfacing, and reconcile.
// Dependencies: mobile-core
// ============================================================================
//! ## Overview
//! Drives [`mobile_core::AppLifecycleService`] over in-memory stores, using
//! fault-injecting secret stores to force registry failures.

#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use common::FailingSecretStore;
use common::ListHookStore;
use common::ListHookTiming;
use common::harness;
use mobile_core::ApiKeyRegistry;
use mobile_core::App;
use mobile_core::AppLifecycleService;
use mobile_core::AppRepository;
use mobile_core::ClientType;
use mobile_core::LifecycleError;
use mobile_core::LifecycleStep;
use mobile_core::RepositoryError;

#[test]
fn create_issues_key_sets_icon_and_registers() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Ios)).unwrap();

    let suffix = app.id.strip_prefix("shop-").unwrap();
    assert!(!suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(app.icon(), Some("fa-apple"));
    assert_eq!(app.api_key.len(), 43);
    assert!(app.created().is_some());

    let stored = h.service.repository().read_by_name("shop").unwrap();
    assert_eq!(stored, app);
    assert_eq!(h.service.registry().lookup(&app.id).unwrap(), Some(app.api_key));
}

#[test]
fn create_other_client_type_has_no_icon() {
    let h = harness();
    let app = h.service.create(App::new("tool", ClientType::Other)).unwrap();
    assert_eq!(app.icon(), None);
    assert_eq!(h.service.repository().read(&app.id).unwrap().icon(), None);
}

#[test]
fn each_app_gets_a_distinct_key() {
    let h = harness();
    let first = h.service.create(App::new("one", ClientType::Android)).unwrap();
    let second = h.service.create(App::new("two", ClientType::Cordova)).unwrap();
    assert_ne!(first.api_key, second.api_key);
    assert_eq!(second.icon(), Some("icon-cordova"));
    assert_eq!(h.service.registry().entries().unwrap().len(), 2);
}

#[test]
fn duplicate_create_fails_without_touching_registry() {
    let h = harness();
    let first = h.service.create(App::new("shop", ClientType::Ios)).unwrap();
    let err = h.service.create(App::new("shop", ClientType::Android)).unwrap_err();
    assert!(matches!(err, LifecycleError::Repository(RepositoryError::Conflict(_))));

    let entries = h.service.registry().entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries.get(&first.id), Some(&first.api_key));
}

#[test]
fn delete_removes_record_and_key() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Ios)).unwrap();
    h.service.delete(&app.id).unwrap();

    assert!(h.service.repository().list().unwrap().is_empty());
    assert_eq!(h.service.registry().lookup(&app.id).unwrap(), None);
    assert!(matches!(
        h.service.delete(&app.id),
        Err(LifecycleError::Repository(RepositoryError::NotFound(_)))
    ));
}

#[test]
fn registry_failure_after_create_is_partial_and_reconcile_repairs_it() {
    let h = harness();
    let repository = AppRepository::new(Arc::new(h.configs.clone()));
    let broken = AppLifecycleService::new(
        repository.clone(),
        ApiKeyRegistry::new(Arc::new(FailingSecretStore::default())),
    );

    let err = broken.create(App::new("shop", ClientType::Ios)).unwrap_err();
    let (app_id, step) = match err {
        LifecycleError::PartialFailure { app_id, step, .. } => (app_id, step),
        other => panic!("expected partial failure, got {other:?}"),
    };
    assert_eq!(step, LifecycleStep::RegisterApiKey);
    let stored = repository.read(&app_id).unwrap();
    assert_eq!(h.service.registry().lookup(&app_id).unwrap(), None);

    let report = h.service.reconcile().unwrap();
    assert_eq!(report.registered, vec![app_id.clone()]);
    assert!(report.pruned.is_empty());
    assert_eq!(h.service.registry().lookup(&app_id).unwrap(), Some(stored.api_key));
    assert!(h.service.reconcile().unwrap().is_clean());
}

#[test]
fn registry_failure_after_delete_is_partial_and_reconcile_prunes() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Android)).unwrap();
    let broken = AppLifecycleService::new(
        AppRepository::new(Arc::new(h.configs.clone())),
        ApiKeyRegistry::new(Arc::new(FailingSecretStore {
            inner: h.secrets.clone(),
        })),
    );

    let err = broken.delete(&app.id).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::PartialFailure { step: LifecycleStep::UnregisterApiKey, .. }
    ));
    assert!(h.service.repository().list().unwrap().is_empty());
    assert!(h.service.registry().lookup(&app.id).unwrap().is_some());

    let report = h.service.reconcile().unwrap();
    assert_eq!(report.pruned, vec![app.id.clone()]);
    assert!(h.service.registry().entries().unwrap().is_empty());
}

#[test]
fn verify_api_key_accepts_only_the_registered_key() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Ios)).unwrap();

    assert_eq!(h.service.verify_api_key(&app.id, &app.api_key).unwrap().id, app.id);
    assert!(matches!(
        h.service.verify_api_key(&app.id, "wrong"),
        Err(LifecycleError::InvalidApiKey(_))
    ));
    assert!(matches!(h.service.verify_api_key(&app.id, ""), Err(LifecycleError::InvalidApiKey(_))));
    assert!(matches!(
        h.service.verify_api_key("ghost-1", &app.api_key),
        Err(LifecycleError::Repository(RepositoryError::NotFound(_)))
    ));
}

#[test]
fn verify_api_key_without_registry_entry_is_rejected() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Ios)).unwrap();
    h.service.registry().remove_entry(&app.id).unwrap();
    assert!(matches!(
        h.service.verify_api_key(&app.id, &app.api_key),
        Err(LifecycleError::InvalidApiKey(_))
    ));
}

#[test]
fn reconcile_keeps_key_of_app_created_while_listing() {
    let h = harness();
    let writer = h.service.clone();
    let created = Arc::new(std::sync::Mutex::new(None));
    let created_slot = Arc::clone(&created);
    let store = ListHookStore::new(
        h.configs.clone(),
        ListHookTiming::AfterList,
        Box::new(move || {
            let app = writer.create(App::new("shop", ClientType::Ios)).unwrap();
            *created_slot.lock().unwrap() = Some(app);
        }),
    );
    let reconciler = AppLifecycleService::new(
        AppRepository::new(Arc::new(store)),
        ApiKeyRegistry::new(Arc::new(h.secrets.clone())),
    );

    let report = reconciler.reconcile().unwrap();
    let app = created.lock().unwrap().clone().unwrap();

    assert!(report.pruned.is_empty(), "live app was pruned: {report:?}");
    assert!(h.service.repository().read(&app.id).is_ok());
    assert_eq!(h.service.registry().lookup(&app.id).unwrap(), Some(app.api_key.clone()));
    assert_eq!(h.service.verify_api_key(&app.id, &app.api_key).unwrap().id, app.id);
}

#[test]
fn reconcile_skips_app_deleted_while_listing() {
    let h = harness();
    let kept = h.service.create(App::new("kept", ClientType::Android)).unwrap();
    let doomed = h.service.create(App::new("doomed", ClientType::Ios)).unwrap();
    let writer = h.service.clone();
    let doomed_id = doomed.id.clone();
    let store = ListHookStore::new(
        h.configs.clone(),
        ListHookTiming::BeforeList,
        Box::new(move || writer.delete(&doomed_id).unwrap()),
    );
    let reconciler = AppLifecycleService::new(
        AppRepository::new(Arc::new(store)),
        ApiKeyRegistry::new(Arc::new(h.secrets.clone())),
    );

    let report = reconciler.reconcile().unwrap();

    assert!(report.is_clean(), "unexpected repairs: {report:?}");
    assert_eq!(h.service.registry().lookup(&doomed.id).unwrap(), None);
    assert_eq!(h.service.registry().lookup(&kept.id).unwrap(), Some(kept.api_key));
}

#[test]
fn reconcile_never_replaces_a_registered_key() {
    let h = harness();
    let app = h.service.create(App::new("shop", ClientType::Ios)).unwrap();
    h.service.registry().add_entry(&app.id, "rotated-key").unwrap();

    let report = h.service.reconcile().unwrap();

    assert!(report.is_clean());
    assert_eq!(h.service.registry().lookup(&app.id).unwrap().as_deref(), Some("rotated-key"));
}
