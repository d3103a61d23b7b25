// crates/lexgate-gateway/src/telemetry.rs
// ============================================================================
// Module: Gateway Telemetry
// Description: Observability hooks for gate decisions and latencies.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: lexgate-core, serde
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for gate decision counters
//! and latency histograms. It is intentionally dependency-light so
//! deployments can plug in Prometheus or OpenTelemetry without redesign.
//! Labels must never carry raw API keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use lexgate_core::Tier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for gate request histograms.
pub const GATE_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Gate stage classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    /// Readiness gate.
    Readiness,
    /// Credential parsing (Authorization header).
    CredentialParse,
    /// Key validation against the store.
    Validation,
    /// Quota accounting.
    Quota,
    /// Feature authorization.
    Feature,
    /// Forwarding to the inner tool router.
    Forward,
}

impl GateStage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readiness => "readiness",
            Self::CredentialParse => "credential_parse",
            Self::Validation => "validation",
            Self::Quota => "quota",
            Self::Feature => "feature",
            Self::Forward => "forward",
        }
    }
}

/// Gate decision outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Request was admitted and forwarded.
    Admitted,
    /// Request was rejected with an error envelope.
    Rejected,
}

impl GateOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Rejected => "rejected",
        }
    }
}

/// Gate decision metric event payload.
///
/// # Invariants
/// - Optional fields are `None` when the metadata is unavailable.
#[derive(Debug, Clone)]
pub struct GateMetricEvent {
    /// Stage that produced the decision.
    pub stage: GateStage,
    /// Decision outcome.
    pub outcome: GateOutcome,
    /// Caller tier when the credential resolved.
    pub tier: Option<Tier>,
    /// Operation name carried on the request.
    pub operation: String,
    /// Feature category derived from the operation.
    pub category: String,
    /// JSON-RPC error code when the request was rejected.
    pub error_code: Option<i64>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for gate decisions and latencies.
pub trait GateMetrics: Send + Sync {
    /// Records a decision counter event.
    fn record_decision(&self, event: GateMetricEvent);
    /// Records a latency observation for the gate overhead.
    fn record_latency(&self, event: GateMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopGateMetrics;

impl GateMetrics for NoopGateMetrics {
    fn record_decision(&self, _event: GateMetricEvent) {}

    fn record_latency(&self, _event: GateMetricEvent, _latency: Duration) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
