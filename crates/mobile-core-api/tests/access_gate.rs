// crates/mobile-core-api/tests/access_gate.rs
// ============================================================================
// Module: Access Gate Tests
// Description: End-to-end gate behavior over a live axum server.
// Purpose: Verify exemptions, token extraction, and status mapping.
// Dependencies: mobile-core-api, reqwest
// ============================================================================

//! ## Overview
//! Requests go over real sockets to a background server whose user check is
//! a fixed token table.

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

use mobile_core_api::token_fingerprint;
use reqwest::StatusCode;
use serde_json::Value;

use crate::common::ADMIN_TOKEN;
use crate::common::BROKEN_TOKEN;
use crate::common::REJECTED_TOKEN;
use crate::common::spawn_server;

#[test]
fn exempt_routes_skip_the_user_check() {
    let server = spawn_server();
    let response = server.client().get(server.url("/sys/info/ping")).send().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().unwrap(), "OK");

    let response = server.client().get(server.url("/sys/info/health")).send().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().unwrap();
    assert_eq!(body["status"], "ok");

    assert!(server.check.calls.lock().unwrap().is_empty());
    let events = server.gate_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event["decision"] == "exempt"));
}

#[test]
fn exempt_routes_ignore_a_rejected_token() {
    let server = spawn_server();
    let response = server
        .client()
        .get(server.url("/sys/info/ping"))
        .bearer_auth(REJECTED_TOKEN)
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server.check.calls.lock().unwrap().is_empty());
}

#[test]
fn missing_token_is_unauthorized() {
    let server = spawn_server();
    let response = server.client().get(server.url("/apps")).send().unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().unwrap(), "no token provided access denied");
    let events = server.gate_events();
    assert_eq!(events[0]["decision"], "deny");
    assert_eq!(events[0]["status"], 401);
    assert!(server.check.calls.lock().unwrap().is_empty());
}

#[test]
fn near_miss_of_an_exempt_path_is_gated() {
    let server = spawn_server();
    let response = server.client().get(server.url("/apps/sys/info/ping")).send().unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn accepted_token_reaches_the_handler() {
    let server = spawn_server();
    let response =
        server.client().get(server.url("/apps")).bearer_auth(ADMIN_TOKEN).send().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().unwrap();
    assert_eq!(body, serde_json::json!([]));
    assert_eq!(server.check.calls.lock().unwrap().as_slice(), [ADMIN_TOKEN.to_string()]);

    let events = server.gate_events();
    assert_eq!(events[0]["decision"], "allow");
    assert_eq!(events[0]["username"], "admin");
    assert_eq!(events[0]["token_fingerprint"], token_fingerprint(ADMIN_TOKEN));
    assert!(!serde_json::to_string(&events).unwrap().contains(ADMIN_TOKEN));
}

#[test]
fn forwarded_access_token_is_accepted() {
    let server = spawn_server();
    let response = server
        .client()
        .get(server.url("/apps"))
        .header("x-forwarded-access-token", ADMIN_TOKEN)
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn rejected_token_is_unauthorized() {
    let server = spawn_server();
    let response =
        server.client().get(server.url("/apps")).bearer_auth(REJECTED_TOKEN).send().unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let events = server.gate_events();
    assert_eq!(events[0]["decision"], "deny");
    assert_eq!(events[0]["status"], 401);
}

#[test]
fn check_failure_is_an_internal_error() {
    let server = spawn_server();
    let response =
        server.client().get(server.url("/apps")).bearer_auth(BROKEN_TOKEN).send().unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let events = server.gate_events();
    assert_eq!(events[0]["status"], 500);
}

#[test]
fn every_request_is_checked_again() {
    let server = spawn_server();
    for _ in 0 .. 3 {
        let response =
            server.client().get(server.url("/apps")).bearer_auth(ADMIN_TOKEN).send().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(server.check.calls.lock().unwrap().len(), 3);
}
