// crates/lexgate-gateway/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: Assembly and lifecycle for the gating layer.
// Purpose: Wire stores, limiters, and the interceptor around a host router.
// Dependencies: axum, lexgate-core, lexgate-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`GatewayServer`] assembles the gate from configuration: it selects the
//! credential store backend, pairs it with the matching limiter (durable
//! ledger for sqlite, in-process counters for memory), and layers the
//! interceptor over whatever router the host supplies. The readiness gate
//! starts closed; [`GatewayServer::serve`] opens it only once the listener
//! is bound, and marks it failed if startup errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use lexgate_core::CredentialStore;
use lexgate_core::FeatureAuthorizer;
use lexgate_core::KeyValidator;
use lexgate_core::LedgerRateLimiter;
use lexgate_core::MemoryCredentialStore;
use lexgate_core::MemoryRateLimiter;
use lexgate_core::PolicyTable;
use lexgate_core::RateLimiter;
use lexgate_core::ReadinessGate;
use lexgate_store_sqlite::SqliteCredentialStore;
use lexgate_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

use crate::audit::GateAuditSink;
use crate::audit::GateStderrAuditSink;
use crate::config::ConfigError;
use crate::config::GatewayConfig;
use crate::config::StoreBackend;
use crate::interceptor::GatewayState;
use crate::interceptor::intercept;
use crate::telemetry::GateMetrics;
use crate::telemetry::NoopGateMetrics;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway assembly and serving errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration rejected during assembly.
    #[error("gateway config error: {0}")]
    Config(String),
    /// Credential store could not be opened.
    #[error("gateway store error: {0}")]
    Store(String),
    /// Listener could not be bound or served.
    #[error("gateway transport error: {0}")]
    Transport(String),
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Assembled gateway ready to wrap a host router.
pub struct GatewayServer {
    /// Validated configuration.
    config: GatewayConfig,
    /// Shared credential store.
    store: Arc<dyn CredentialStore>,
    /// Shared interceptor state.
    state: GatewayState,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer").field("config", &self.config).finish_non_exhaustive()
    }
}

impl GatewayServer {
    /// Assembles the gateway from configuration with default sinks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid or the
    /// store cannot be opened.
    pub fn from_config(config: GatewayConfig) -> Result<Self, ServerError> {
        Self::with_sinks(config, Arc::new(GateStderrAuditSink), Arc::new(NoopGateMetrics))
    }

    /// Assembles the gateway with explicit audit and metrics sinks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid or the
    /// store cannot be opened.
    pub fn with_sinks(
        config: GatewayConfig,
        audit: Arc<dyn GateAuditSink>,
        metrics: Arc<dyn GateMetrics>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let policy = Arc::new(config.policy_table()?);
        policy.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = open_store(&config)?;
        let limiter = build_limiter(&config, Arc::clone(&store), Arc::clone(&policy));
        let readiness = Arc::new(ReadinessGate::new());
        readiness.mark_starting();
        let state = GatewayState {
            readiness,
            validator: Arc::new(KeyValidator::new(Arc::clone(&store))),
            limiter,
            features: Arc::new(FeatureAuthorizer::new(policy)),
            tool_path: config.server.tool_path.clone(),
            product: config.product.clone(),
            audit,
            metrics,
        };
        Ok(Self {
            config,
            store,
            state,
        })
    }

    /// Returns the shared credential store for key provisioning.
    #[must_use]
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    /// Returns the readiness gate for lifecycle control.
    #[must_use]
    pub fn readiness(&self) -> Arc<ReadinessGate> {
        Arc::clone(&self.state.readiness)
    }

    /// Layers the interceptor over the host-provided router.
    #[must_use]
    pub fn router(&self, inner: Router) -> Router {
        inner.layer(middleware::from_fn_with_state(self.state.clone(), intercept))
    }

    /// Binds the configured address and serves the wrapped router.
    ///
    /// The readiness gate opens after the listener is bound and is marked
    /// failed when binding or serving errors.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the listener cannot be bound or the
    /// server loop fails.
    pub async fn serve(self, inner: Router) -> Result<(), ServerError> {
        let app = self.router(inner);
        let listener = match tokio::net::TcpListener::bind(self.config.server.bind).await {
            Ok(listener) => listener,
            Err(err) => {
                self.state.readiness.mark_failed();
                return Err(ServerError::Transport(format!("bind failed: {err}")));
            }
        };
        self.state.readiness.mark_ready();
        let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(format!("serve failed: {err}")));
        if result.is_err() {
            self.state.readiness.mark_failed();
        }
        result
    }
}

// ============================================================================
// SECTION: Assembly Helpers
// ============================================================================

/// Opens the configured credential store backend.
fn open_store(config: &GatewayConfig) -> Result<Arc<dyn CredentialStore>, ServerError> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
        StoreBackend::Sqlite => {
            let path = config
                .store
                .path
                .clone()
                .ok_or_else(|| ServerError::Config("store.path required for sqlite".to_string()))?;
            let store = SqliteCredentialStore::new(&SqliteStoreConfig::new(path))
                .map_err(|err| ServerError::Store(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Pairs the store backend with the matching limiter.
fn build_limiter(
    config: &GatewayConfig,
    store: Arc<dyn CredentialStore>,
    policy: Arc<PolicyTable>,
) -> Arc<dyn RateLimiter> {
    match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryRateLimiter::new(policy)),
        StoreBackend::Sqlite => Arc::new(LedgerRateLimiter::new(store, policy)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn from_config_starts_not_ready() {
        let server =
            GatewayServer::from_config(GatewayConfig::default()).expect("assemble gateway");
        assert!(!server.readiness().is_ready());
    }

    #[test]
    fn sqlite_backend_without_path_is_rejected() {
        let config = GatewayConfig {
            store: crate::config::StoreConfig {
                backend: StoreBackend::Sqlite,
                path: None,
            },
            ..GatewayConfig::default()
        };
        let err = GatewayServer::from_config(config).expect_err("missing path must fail");
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn sqlite_backend_opens_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = GatewayConfig {
            store: crate::config::StoreConfig {
                backend: StoreBackend::Sqlite,
                path: Some(dir.path().join("gate.db")),
            },
            ..GatewayConfig::default()
        };
        let server = GatewayServer::from_config(config).expect("assemble gateway");
        assert!(!server.readiness().is_ready());
    }
}
