// crates/lexgate-gateway/tests/server.rs
// ============================================================================
// Module: Server Assembly Tests
// Description: End-to-end tests for configuration-driven gateway assembly.
// Purpose: Verify TOML config, store selection, and readiness lifecycle.
// Dependencies: lexgate-core, lexgate-gateway, reqwest, tempfile, tokio
// ============================================================================

//! ## Overview
//! These tests assemble the gateway from TOML the way a host would: parse
//! config, provision keys through the exposed store handle, wrap an inner
//! router, and drive requests through it. Both store backends are covered,
//! along with the closed-until-ready lifecycle.

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

use lexgate_core::Tier;
use lexgate_gateway::GatewayConfig;
use lexgate_gateway::GatewayServer;
use lexgate_gateway::OPERATION_HEADER;
use serde_json::Value;

use common::inner_app;
use common::key_record;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serves the assembled gateway on an ephemeral port.
async fn spawn_server(server: &GatewayServer) -> std::net::SocketAddr {
    let app = server.router(inner_app());
    let listener =
        tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    }));
    addr
}

async fn call_tool(addr: std::net::SocketAddr, key: &str, operation: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/mcp"))
        .header("authorization", format!("Bearer {key}"))
        .header(OPERATION_HEADER, operation)
        .body("{}")
        .send()
        .await
        .expect("send request")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn toml_configured_gateway_enforces_tier_overrides() {
    let toml = r#"
        [limits.tiers.free]
        quota_per_period = 2
        allowed_features = ["bills"]

        [product]
        upgrade_url = "https://example.com/upgrade"
    "#;
    let config = GatewayConfig::from_toml_str(toml).expect("parse config");
    let server = GatewayServer::from_config(config).expect("assemble gateway");
    server
        .credential_store()
        .create_key(key_record("lg_config_test_key_000001", "user-cfg", Tier::Free))
        .await
        .expect("seed key");
    server.readiness().mark_ready();
    let addr = spawn_server(&server).await;

    // Within quota and allowed category.
    assert_eq!(call_tool(addr, "lg_config_test_key_000001", "search_bills").await.status(), 200);

    // Disallowed category.
    let denied = call_tool(addr, "lg_config_test_key_000001", "get_member_details").await;
    assert_eq!(denied.status(), 403);

    // The denied attempt still consumed quota, so the next call trips it.
    let exhausted = call_tool(addr, "lg_config_test_key_000001", "search_bills").await;
    assert_eq!(exhausted.status(), 429);
    let body = exhausted.json::<Value>().await.expect("parse envelope");
    assert_eq!(body["error"]["data"]["upgrade_url"], "https://example.com/upgrade");
}

#[tokio::test]
async fn gateway_stays_closed_until_marked_ready() {
    let server =
        GatewayServer::from_config(GatewayConfig::default()).expect("assemble gateway");
    server
        .credential_store()
        .create_key(key_record("lg_lifecycle_key_0000001", "user-life", Tier::Pro))
        .await
        .expect("seed key");
    let addr = spawn_server(&server).await;

    let early = call_tool(addr, "lg_lifecycle_key_0000001", "search_bills").await;
    assert_eq!(early.status(), 503);

    server.readiness().mark_ready();
    let late = call_tool(addr, "lg_lifecycle_key_0000001", "search_bills").await;
    assert_eq!(late.status(), 200);
}

#[tokio::test]
async fn sqlite_backend_persists_usage_across_assemblies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("gate.db");
    let toml = format!(
        r#"
        [store]
        backend = "sqlite"
        path = "{}"

        [limits.tiers.free]
        quota_per_period = 2
        "#,
        db_path.display()
    );

    let config = GatewayConfig::from_toml_str(&toml).expect("parse config");
    let server = GatewayServer::from_config(config).expect("assemble gateway");
    server
        .credential_store()
        .create_key(key_record("lg_durable_key_000000001", "user-dur", Tier::Free))
        .await
        .expect("seed key");
    server.readiness().mark_ready();
    let addr = spawn_server(&server).await;
    assert_eq!(call_tool(addr, "lg_durable_key_000000001", "search_bills").await.status(), 200);
    assert_eq!(call_tool(addr, "lg_durable_key_000000001", "search_bills").await.status(), 200);

    // A fresh assembly over the same database sees the consumed quota.
    let config = GatewayConfig::from_toml_str(&toml).expect("parse config");
    let server = GatewayServer::from_config(config).expect("assemble gateway");
    server.readiness().mark_ready();
    let addr = spawn_server(&server).await;
    let denied = call_tool(addr, "lg_durable_key_000000001", "search_bills").await;
    assert_eq!(denied.status(), 429);
}
