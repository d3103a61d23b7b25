// crates/lexgate-gateway/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured audit events for gate decisions.
// Purpose: Emit redacted audit logs without hard dependencies.
// Dependencies: lexgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for gate decision
//! logging. Events carry user identity, the operation and its category, and
//! the decision outcome; raw API keys never appear in audit output. Sinks
//! are intentionally lightweight so deployments can route events to their
//! preferred logging pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use lexgate_core::Tier;
use serde::Serialize;

use crate::telemetry::GateOutcome;
use crate::telemetry::GateStage;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gate decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// User identifier when the credential resolved.
    pub user_id: Option<String>,
    /// Caller tier when the credential resolved.
    pub tier: Option<Tier>,
    /// Operation name carried on the request.
    pub operation: String,
    /// Feature category derived from the operation.
    pub category: String,
    /// Stage that produced the decision.
    pub stage: GateStage,
    /// Decision outcome.
    pub outcome: GateOutcome,
    /// JSON-RPC error code when the request was rejected.
    pub error_code: Option<i64>,
}

impl GateAuditEvent {
    /// Creates an admitted-request event.
    #[must_use]
    pub fn admitted(
        timestamp_ms: u64,
        user_id: String,
        tier: Tier,
        operation: String,
        category: String,
    ) -> Self {
        Self {
            event: "gate_decision",
            timestamp_ms,
            user_id: Some(user_id),
            tier: Some(tier),
            operation,
            category,
            stage: GateStage::Forward,
            outcome: GateOutcome::Admitted,
            error_code: None,
        }
    }

    /// Creates a rejected-request event.
    #[must_use]
    pub fn rejected(
        timestamp_ms: u64,
        user_id: Option<String>,
        tier: Option<Tier>,
        operation: String,
        category: String,
        stage: GateStage,
        error_code: i64,
    ) -> Self {
        Self {
            event: "gate_decision",
            timestamp_ms,
            user_id,
            tier,
            operation,
            category,
            stage,
            outcome: GateOutcome::Rejected,
            error_code: Some(error_code),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gate decision events.
pub trait GateAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct GateStderrAuditSink;

impl GateAuditSink for GateStderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct GateFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl GateFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GateAuditSink for GateFileAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct GateNoopAuditSink;

impl GateAuditSink for GateNoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
