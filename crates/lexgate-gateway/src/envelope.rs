// crates/lexgate-gateway/src/envelope.rs
// ============================================================================
// Module: Rejection Envelopes
// Description: JSON-RPC error envelopes for gate rejections.
// Purpose: Emit protocol-shaped denials clients can parse and act on.
// Dependencies: axum, lexgate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Rejections never use bare HTTP error bodies. Every denial is a JSON-RPC
//! 2.0 error object whose code identifies the gate stage that refused the
//! request and whose `data` member carries machine-readable remediation
//! detail (usage numbers, reset time, guidance URLs). The HTTP status is set
//! alongside so plain HTTP clients see a sensible code too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use lexgate_core::GatewayErrorCode;
use lexgate_core::Tier;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::config::ProductConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// JSON-RPC 2.0 error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Protocol version marker, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Request identifier; null when the request was never read.
    pub id: Value,
    /// Error body.
    pub error: JsonRpcErrorBody,
}

/// JSON-RPC 2.0 error body.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorBody {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable remediation detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Context attached to a rejection envelope's `data` member.
#[derive(Debug, Clone, Default)]
pub struct RejectionContext {
    /// Caller tier when known.
    pub tier: Option<Tier>,
    /// Denied feature category when the feature gate refused.
    pub category: Option<String>,
    /// Usage within the current period when the quota gate refused.
    pub current_usage: Option<u64>,
    /// Period quota when the quota gate refused.
    pub limit: Option<u64>,
    /// When the current period resets (milliseconds since epoch).
    pub reset_at_ms: Option<u64>,
}

// ============================================================================
// SECTION: Construction
// ============================================================================

impl JsonRpcError {
    /// Builds an envelope for the given gate error code.
    #[must_use]
    pub fn from_code(code: GatewayErrorCode, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Value::Null,
            error: JsonRpcErrorBody {
                code: code.jsonrpc_code(),
                message: code.default_message().to_string(),
                data,
            },
        }
    }

    /// Builds an envelope with a custom message.
    #[must_use]
    pub fn with_message(code: GatewayErrorCode, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Value::Null,
            error: JsonRpcErrorBody {
                code: code.jsonrpc_code(),
                message,
                data,
            },
        }
    }
}

/// Builds the HTTP response for a gate rejection.
///
/// The `data` member always names the rejecting stage via `reason` and
/// includes whichever remediation fields apply, plus signup and upgrade
/// links when configured.
#[must_use]
pub fn rejection_response(
    code: GatewayErrorCode,
    context: &RejectionContext,
    product: &ProductConfig,
    message: Option<String>,
) -> Response {
    let mut data = json!({ "reason": code.as_str() });
    if let Value::Object(fields) = &mut data {
        if let Some(tier) = context.tier {
            fields.insert("tier".to_string(), json!(tier.as_str()));
        }
        if let Some(category) = &context.category {
            fields.insert("category".to_string(), json!(category));
        }
        if let Some(current_usage) = context.current_usage {
            fields.insert("current_usage".to_string(), json!(current_usage));
        }
        if let Some(limit) = context.limit {
            fields.insert("limit".to_string(), json!(limit));
        }
        if let Some(reset_at_ms) = context.reset_at_ms {
            fields.insert("reset_at_ms".to_string(), json!(reset_at_ms));
        }
        if let Some(signup) = &product.signup_url {
            fields.insert("signup_url".to_string(), json!(signup));
        }
        if let Some(upgrade) = &product.upgrade_url {
            fields.insert("upgrade_url".to_string(), json!(upgrade));
        }
    }
    let envelope = match message {
        Some(text) => JsonRpcError::with_message(code, text, Some(data)),
        None => JsonRpcError::from_code(code, Some(data)),
    };
    let status =
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
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
    fn envelope_carries_protocol_marker_and_code() {
        let envelope = JsonRpcError::from_code(GatewayErrorCode::AuthRequired, None);
        let value = serde_json::to_value(&envelope).expect("serialize envelope");
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["error"]["code"], -32001);
        assert!(value["error"].get("data").is_none());
    }

    #[test]
    fn quota_rejection_includes_remediation_fields() {
        let context = RejectionContext {
            tier: Some(Tier::Free),
            current_usage: Some(200),
            limit: Some(200),
            reset_at_ms: Some(1_000_000),
            ..RejectionContext::default()
        };
        let product = ProductConfig {
            signup_url: None,
            upgrade_url: Some("https://example.com/upgrade".to_string()),
        };
        let response =
            rejection_response(GatewayErrorCode::QuotaExceeded, &context, &product, None);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
