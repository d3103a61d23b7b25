// crates/lexgate-gateway/tests/interceptor.rs
// ============================================================================
// Module: Interceptor Tests
// Description: End-to-end gate behavior over real HTTP.
// Purpose: Verify stage order, rejection envelopes, and pass-through paths.
// Dependencies: lexgate-core, lexgate-gateway, reqwest, tokio
// ============================================================================

//! ## Overview
//! Integration tests for the request interceptor: credential parsing and
//! validation rejections, readiness gating, feature denial, and untouched
//! forwarding for admitted and non-tool traffic. Every rejection is checked
//! against the JSON-RPC envelope contract, and store-access assertions prove
//! malformed requests never reach storage.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexgate_core::CredentialStore;
use lexgate_core::LedgerRateLimiter;
use lexgate_core::PolicyTable;
use lexgate_core::Tier;
use lexgate_gateway::OPERATION_HEADER;
use serde_json::Value;

use common::SpyStore;
use common::gate_state;
use common::inner_app;
use common::key_record;
use common::spawn_gateway;

// ============================================================================
// SECTION: Helpers
// ============================================================================

async fn post_tool(
    addr: std::net::SocketAddr,
    auth: Option<&str>,
    operation: Option<&str>,
) -> reqwest::Response {
    let client = reqwest::Client::new();
    let mut request = client.post(format!("http://{addr}/mcp"));
    if let Some(header) = auth {
        request = request.header("authorization", header);
    }
    if let Some(name) = operation {
        request = request.header(OPERATION_HEADER, name);
    }
    request.body("{}").send().await.expect("send request")
}

async fn error_body(response: reqwest::Response) -> Value {
    response.json::<Value>().await.expect("parse error envelope")
}

// ============================================================================
// SECTION: Credential Parsing
// ============================================================================

#[tokio::test]
async fn missing_header_yields_auth_required_envelope() {
    let store = Arc::new(SpyStore::new());
    let addr = spawn_gateway(gate_state(store, PolicyTable::default()), inner_app()).await;

    let response = post_tool(addr, None, Some("search_bills")).await;
    assert_eq!(response.status(), 401);
    let body = error_body(response).await;
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["data"]["reason"], "auth_required");
    assert_eq!(body["error"]["data"]["signup_url"], "https://example.com/signup");
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected_before_any_store_access() {
    let store = Arc::new(SpyStore::new());
    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    let response = post_tool(addr, Some("Basic dXNlcjpwYXNz"), Some("search_bills")).await;
    assert_eq!(response.status(), 401);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(store.lookup_count(), 0);
}

#[tokio::test]
async fn malformed_key_is_rejected_before_any_store_access() {
    let store = Arc::new(SpyStore::new());
    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    // Well-formed scheme, but the key fails shape checks (wrong prefix).
    let response = post_tool(addr, Some("Bearer sk_wrong_prefix_key_000001"), None).await;
    assert_eq!(response.status(), 401);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], -32002);
    assert_eq!(store.lookup_count(), 0);
}

// ============================================================================
// SECTION: Key Validation
// ============================================================================

#[tokio::test]
async fn unknown_key_yields_invalid_credential() {
    let store = Arc::new(SpyStore::new());
    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    let response = post_tool(addr, Some("Bearer lg_never_issued_key_00001"), None).await;
    assert_eq!(response.status(), 401);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], -32002);
    assert_eq!(store.lookup_count(), 1);
}

#[tokio::test]
async fn revoked_and_expired_keys_are_indistinguishable_from_unknown() {
    let store = Arc::new(SpyStore::new());

    let mut revoked = key_record("lg_revoked_key_0000000001", "user-revoked", Tier::Pro);
    revoked.active = false;
    store.create_key(revoked).await.expect("seed revoked key");

    let mut expired = key_record("lg_expired_key_0000000001", "user-expired", Tier::Pro);
    expired.expires_at_ms = Some(1);
    store.create_key(expired).await.expect("seed expired key");

    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    let mut bodies = Vec::new();
    for key in [
        "Bearer lg_revoked_key_0000000001",
        "Bearer lg_expired_key_0000000001",
        "Bearer lg_never_issued_key_00001",
    ] {
        let response = post_tool(addr, Some(key), None).await;
        assert_eq!(response.status(), 401);
        bodies.push(error_body(response).await);
    }
    for body in &bodies {
        assert_eq!(body["error"]["code"], bodies[0]["error"]["code"]);
        assert_eq!(body["error"]["message"], bodies[0]["error"]["message"]);
    }
}

// ============================================================================
// SECTION: Readiness
// ============================================================================

#[tokio::test]
async fn not_ready_gateway_rejects_without_touching_the_store() {
    let store = Arc::new(SpyStore::new());
    store
        .create_key(key_record("lg_valid_key_000000000001", "user-1", Tier::Pro))
        .await
        .expect("seed key");
    let state = gate_state(Arc::clone(&store) as _, PolicyTable::default());
    state.readiness.mark_starting();
    let addr = spawn_gateway(state, inner_app()).await;

    let response =
        post_tool(addr, Some("Bearer lg_valid_key_000000000001"), Some("search_bills")).await;
    assert_eq!(response.status(), 503);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], -32005);
    assert_eq!(store.lookup_count(), 0);
}

// ============================================================================
// SECTION: Feature Gating
// ============================================================================

#[tokio::test]
async fn feature_denial_names_the_tier_and_category() {
    let store = Arc::new(SpyStore::new());
    store
        .create_key(key_record("lg_free_user_key_00000001", "user-free", Tier::Free))
        .await
        .expect("seed key");

    let policy = PolicyTable::default().with_policy(Tier::Free, lexgate_core::TierPolicy {
        quota_per_period: lexgate_core::QuotaLimit::Limited(100),
        allowed_features: lexgate_core::FeatureSet::from_entries(&["bills".to_string()]),
    });
    let addr = spawn_gateway(gate_state(Arc::clone(&store) as _, policy), inner_app()).await;

    let allowed =
        post_tool(addr, Some("Bearer lg_free_user_key_00000001"), Some("search_bills")).await;
    assert_eq!(allowed.status(), 200);

    let denied =
        post_tool(addr, Some("Bearer lg_free_user_key_00000001"), Some("get_member_details"))
            .await;
    assert_eq!(denied.status(), 403);
    let body = error_body(denied).await;
    assert_eq!(body["error"]["code"], -32003);
    assert_eq!(body["error"]["data"]["category"], "members");
    assert_eq!(body["error"]["data"]["tier"], "free");
    assert_eq!(body["error"]["data"]["upgrade_url"], "https://example.com/upgrade");
    let message = body["error"]["message"].as_str().expect("message string");
    assert!(message.contains("free"));
}

// ============================================================================
// SECTION: Forwarding
// ============================================================================

#[tokio::test]
async fn valid_key_is_forwarded_to_the_inner_router() {
    let store = Arc::new(SpyStore::new());
    store
        .create_key(key_record("lg_valid_key_000000000001", "user-1", Tier::Enterprise))
        .await
        .expect("seed key");
    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    let response =
        post_tool(addr, Some("Bearer lg_valid_key_000000000001"), Some("search_bills")).await;
    assert_eq!(response.status(), 200);
    let body = response.json::<Value>().await.expect("parse body");
    assert_eq!(body["result"]["status"], "ok");
}

#[tokio::test]
async fn ledger_usage_events_record_the_request_path() {
    let store = Arc::new(SpyStore::new());
    store
        .create_key(key_record("lg_valid_key_000000000001", "user-1", Tier::Pro))
        .await
        .expect("seed key");

    let mut state = gate_state(Arc::clone(&store) as _, PolicyTable::default());
    state.limiter = Arc::new(LedgerRateLimiter::new(
        Arc::clone(&store) as _,
        Arc::new(PolicyTable::default()),
    ));
    let addr = spawn_gateway(state, inner_app()).await;

    let response =
        post_tool(addr, Some("Bearer lg_valid_key_000000000001"), Some("search_bills")).await;
    assert_eq!(response.status(), 200);

    // The persisted event carries the endpoint path, not the operation name.
    let events = store.recorded_usage();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].endpoint, "/mcp");
    assert_eq!(events[0].feature, "bills");
    assert_eq!(events[0].user_id, "user-1");
}

#[tokio::test]
async fn missing_operation_header_is_gated_under_the_general_category() {
    let store = Arc::new(SpyStore::new());
    store
        .create_key(key_record("lg_valid_key_000000000001", "user-1", Tier::Pro))
        .await
        .expect("seed key");

    // Grant only "general": a headerless request passes, a named one fails.
    let policy = PolicyTable::default().with_policy(Tier::Pro, lexgate_core::TierPolicy {
        quota_per_period: lexgate_core::QuotaLimit::Limited(100),
        allowed_features: lexgate_core::FeatureSet::from_entries(&["general".to_string()]),
    });
    let addr = spawn_gateway(gate_state(Arc::clone(&store) as _, policy), inner_app()).await;

    let unnamed = post_tool(addr, Some("Bearer lg_valid_key_000000000001"), None).await;
    assert_eq!(unnamed.status(), 200);

    let named =
        post_tool(addr, Some("Bearer lg_valid_key_000000000001"), Some("search_bills")).await;
    assert_eq!(named.status(), 403);
}

#[tokio::test]
async fn non_tool_paths_bypass_the_gate_entirely() {
    let store = Arc::new(SpyStore::new());
    let addr =
        spawn_gateway(gate_state(Arc::clone(&store) as _, PolicyTable::default()), inner_app())
            .await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("send health request");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("read body"), "ok");
    assert_eq!(store.lookup_count(), 0);
}
