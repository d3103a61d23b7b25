// crates/lexgate-gateway/tests/common/mod.rs
// ============================================================================
// Module: Gateway Test Harness
// Description: Shared fixtures for gateway integration tests.
// Purpose: Spawn gated routers on ephemeral ports with seeded credentials.
// Dependencies: axum, lexgate-core, lexgate-gateway, tokio
// ============================================================================

//! ## Overview
//! Helpers shared across the gateway integration suites: an inner tool app
//! with plain and streaming routes, a lookup-counting credential store for
//! asserting which requests reach storage, and a spawner that binds an
//! ephemeral port and serves the gated router in the background.

#![allow(
    dead_code,
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
    reason = "Test-only assertions and helpers are permitted; each suite uses a subset."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use lexgate_core::ApiKeyRecord;
use lexgate_core::CredentialStore;
use lexgate_core::CredentialStoreError;
use lexgate_core::FeatureAuthorizer;
use lexgate_core::KeyValidator;
use lexgate_core::MemoryCredentialStore;
use lexgate_core::MemoryRateLimiter;
use lexgate_core::PolicyTable;
use lexgate_core::ReadinessGate;
use lexgate_core::Tier;
use lexgate_core::UsageEvent;
use lexgate_core::hash_key;
use lexgate_gateway::GateNoopAuditSink;
use lexgate_gateway::GatewayState;
use lexgate_gateway::NoopGateMetrics;
use lexgate_gateway::ProductConfig;
use lexgate_gateway::intercept;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// SECTION: Spy Store
// ============================================================================

/// Credential store wrapper that counts `lookup_key` calls and captures
/// recorded usage events.
pub struct SpyStore {
    inner: MemoryCredentialStore,
    lookups: AtomicUsize,
    usage_events: Mutex<Vec<UsageEvent>>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryCredentialStore::new(),
            lookups: AtomicUsize::new(0),
            usage_events: Mutex::new(Vec::new()),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn recorded_usage(&self) -> Vec<UsageEvent> {
        self.usage_events.lock().expect("usage event lock").clone()
    }
}

#[async_trait]
impl CredentialStore for SpyStore {
    async fn lookup_key(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, CredentialStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_key(key_hash).await
    }

    async fn touch_last_used(
        &self,
        key_hash: &str,
        now_ms: u64,
    ) -> Result<(), CredentialStoreError> {
        self.inner.touch_last_used(key_hash, now_ms).await
    }

    async fn create_key(&self, record: ApiKeyRecord) -> Result<(), CredentialStoreError> {
        self.inner.create_key(record).await
    }

    async fn revoke_key(&self, key_hash: &str) -> Result<(), CredentialStoreError> {
        self.inner.revoke_key(key_hash).await
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<(), CredentialStoreError> {
        self.usage_events.lock().expect("usage event lock").push(event.clone());
        self.inner.record_usage(event).await
    }

    async fn usage_since(&self, user_id: &str, since_ms: u64) -> Result<u64, CredentialStoreError> {
        self.inner.usage_since(user_id, since_ms).await
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a key record owned by `user_id` with sensible defaults.
pub fn key_record(raw_key: &str, user_id: &str, tier: Tier) -> ApiKeyRecord {
    ApiKeyRecord {
        key_hash: hash_key(raw_key),
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        tier,
        created_at_ms: 1_000,
        expires_at_ms: None,
        active: true,
        last_used_at_ms: None,
    }
}

/// Builds interceptor state over the given store and policy.
///
/// The readiness gate starts open; suites that exercise the readiness stage
/// flip it themselves via the returned state.
pub fn gate_state(store: Arc<dyn CredentialStore>, policy: PolicyTable) -> GatewayState {
    let policy = Arc::new(policy);
    let readiness = Arc::new(ReadinessGate::new());
    readiness.mark_ready();
    GatewayState {
        readiness,
        validator: Arc::new(KeyValidator::new(Arc::clone(&store))),
        limiter: Arc::new(MemoryRateLimiter::new(Arc::clone(&policy))),
        features: Arc::new(FeatureAuthorizer::new(policy)),
        tool_path: "/mcp".to_string(),
        product: ProductConfig {
            signup_url: Some("https://example.com/signup".to_string()),
            upgrade_url: Some("https://example.com/upgrade".to_string()),
        },
        audit: Arc::new(GateNoopAuditSink),
        metrics: Arc::new(NoopGateMetrics),
    }
}

/// Inner tool app: a plain tool route, a streaming route, and a health route.
pub fn inner_app() -> Router {
    Router::new()
        .route("/mcp", post(tool_handler))
        .route("/mcp/stream", post(stream_handler))
        .route("/health", get(|| async { "ok" }))
}

async fn tool_handler() -> Json<serde_json::Value> {
    Json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "status": "ok" } }))
}

/// Emits three body chunks with deliberate gaps between them.
async fn stream_handler() -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::convert::Infallible>>(1);
    tokio::spawn(async move {
        for chunk in ["chunk-one;", "chunk-two;", "chunk-three;"] {
            if tx.send(Ok(Bytes::from_static(chunk.as_bytes()))).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });
    Response::builder()
        .header("content-type", "application/octet-stream")
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .expect("build streaming response")
}

// ============================================================================
// SECTION: Spawner
// ============================================================================

/// Serves the gated router on an ephemeral port, returning its address.
pub async fn spawn_gateway(state: GatewayState, inner: Router) -> SocketAddr {
    let app = inner.layer(middleware::from_fn_with_state(state, intercept));
    let listener =
        tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    }));
    addr
}
