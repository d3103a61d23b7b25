// crates/lexgate-gateway/src/lib.rs
// ============================================================================
// Module: Lexgate Gateway
// Description: HTTP interception layer for the legislative tool server.
// Purpose: Enforce credentials, tiers, and quotas around tool traffic.
// Dependencies: axum, lexgate-core, lexgate-store-sqlite, serde, tokio
// ============================================================================

//! ## Overview
//! This crate wraps a host-provided tool router with a gating layer. Every
//! tool request passes the same stage order: readiness, credential parsing,
//! key validation, quota accounting, and feature authorization. Rejections
//! leave the gateway as JSON-RPC error envelopes with guidance URLs; admitted
//! requests are forwarded untouched, including streaming response bodies.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod config;
pub mod envelope;
pub mod interceptor;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::GateFileAuditSink;
pub use audit::GateNoopAuditSink;
pub use audit::GateStderrAuditSink;
pub use config::ConfigError;
pub use config::GatewayConfig;
pub use config::LimitsConfig;
pub use config::ProductConfig;
pub use config::ServerConfig;
pub use config::StoreBackend;
pub use config::StoreConfig;
pub use config::TierLimitConfig;
pub use envelope::JsonRpcError;
pub use envelope::JsonRpcErrorBody;
pub use envelope::RejectionContext;
pub use envelope::rejection_response;
pub use interceptor::GatewayState;
pub use interceptor::OPERATION_HEADER;
pub use interceptor::intercept;
pub use server::GatewayServer;
pub use server::ServerError;
pub use telemetry::GATE_LATENCY_BUCKETS_MS;
pub use telemetry::GateMetricEvent;
pub use telemetry::GateMetrics;
pub use telemetry::GateOutcome;
pub use telemetry::GateStage;
pub use telemetry::NoopGateMetrics;
