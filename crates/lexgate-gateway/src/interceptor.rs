// crates/lexgate-gateway/src/interceptor.rs
// ============================================================================
// Module: Request Interceptor
// Description: Gate middleware applied ahead of the inner tool router.
// Purpose: Enforce readiness, credentials, quotas, and features per request.
// Dependencies: axum, lexgate-core
// ============================================================================

//! ## Overview
//! The interceptor runs as axum middleware in front of the host-provided
//! tool router. Stage order is fixed: readiness, credential parsing, key
//! validation, quota accounting, feature authorization, forward. The request
//! body is never read and the response body is never buffered, so streaming
//! responses pass through chunk by chunk. The operation name rides on the
//! `x-lexgate-operation` header; requests without it are gated under the
//! general category.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::extract::Request;
use axum::extract::State;
use axum::http::Method;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use lexgate_core::FeatureAuthorizer;
use lexgate_core::GatewayErrorCode;
use lexgate_core::KeyValidator;
use lexgate_core::RateDecision;
use lexgate_core::RateLimiter;
use lexgate_core::ReadinessGate;
use lexgate_core::UserContext;
use lexgate_core::ValidationError;
use lexgate_core::category_for_operation;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::config::ProductConfig;
use crate::envelope::RejectionContext;
use crate::envelope::rejection_response;
use crate::telemetry::GateMetricEvent;
use crate::telemetry::GateMetrics;
use crate::telemetry::GateOutcome;
use crate::telemetry::GateStage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request header carrying the tool operation name.
pub const OPERATION_HEADER: &str = "x-lexgate-operation";

/// Operation label used when the header is absent or unreadable.
const UNKNOWN_OPERATION: &str = "unknown";

/// Maximum accepted authorization header size in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 1024;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for the interceptor middleware.
#[derive(Clone)]
pub struct GatewayState {
    /// Startup readiness gate.
    pub readiness: Arc<ReadinessGate>,
    /// API key validator.
    pub validator: Arc<KeyValidator>,
    /// Usage rate limiter.
    pub limiter: Arc<dyn RateLimiter>,
    /// Tier feature authorizer.
    pub features: Arc<FeatureAuthorizer>,
    /// Path prefix for tool-protocol traffic subject to gating.
    pub tool_path: String,
    /// Commercial guidance links for rejection payloads.
    pub product: ProductConfig,
    /// Audit sink for gate decisions.
    pub audit: Arc<dyn GateAuditSink>,
    /// Metrics sink for gate decisions.
    pub metrics: Arc<dyn GateMetrics>,
}

/// Inputs required to report a rejection decision.
struct RejectionReport<'a> {
    /// Decision timestamp (milliseconds since epoch).
    now_ms: u64,
    /// When gate processing for the request began.
    started: Instant,
    /// Caller context when the credential resolved.
    user: Option<&'a UserContext>,
    /// Operation name carried on the request.
    operation: &'a str,
    /// Feature category derived from the operation.
    category: &'a str,
    /// Stage that refused the request.
    stage: GateStage,
    /// Rejection code for the envelope.
    code: GatewayErrorCode,
}

impl GatewayState {
    /// Returns whether the request targets the gated tool endpoint.
    fn is_gated(&self, request: &Request) -> bool {
        request.method() == Method::POST && request.uri().path().starts_with(&self.tool_path)
    }

    /// Emits audit and metric records for a rejection.
    fn report_rejection(&self, report: &RejectionReport<'_>) {
        let tier = report.user.map(|ctx| ctx.tier);
        self.audit.record(&GateAuditEvent::rejected(
            report.now_ms,
            report.user.map(|ctx| ctx.user_id.clone()),
            tier,
            report.operation.to_string(),
            report.category.to_string(),
            report.stage,
            report.code.jsonrpc_code(),
        ));
        let event = GateMetricEvent {
            stage: report.stage,
            outcome: GateOutcome::Rejected,
            tier,
            operation: report.operation.to_string(),
            category: report.category.to_string(),
            error_code: Some(report.code.jsonrpc_code()),
        };
        self.metrics.record_decision(event.clone());
        self.metrics.record_latency(event, report.started.elapsed());
    }

    /// Emits audit and metric records for an admission.
    fn report_admission(
        &self,
        now_ms: u64,
        started: Instant,
        user: &UserContext,
        operation: &str,
        category: &str,
    ) {
        self.audit.record(&GateAuditEvent::admitted(
            now_ms,
            user.user_id.clone(),
            user.tier,
            operation.to_string(),
            category.to_string(),
        ));
        let event = GateMetricEvent {
            stage: GateStage::Forward,
            outcome: GateOutcome::Admitted,
            tier: Some(user.tier),
            operation: operation.to_string(),
            category: category.to_string(),
            error_code: None,
        };
        self.metrics.record_decision(event.clone());
        self.metrics.record_latency(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Intercepts tool requests and enforces the gate stages in order.
///
/// Non-tool traffic (wrong method or path) is forwarded untouched. The
/// function never reads the request body, so forwarding preserves whatever
/// the inner router expects, and the returned response body flows through
/// unbuffered.
pub async fn intercept(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.is_gated(&request) {
        return next.run(request).await;
    }
    let started = Instant::now();
    let now_ms = wall_clock_ms();
    let operation = operation_name(&request);
    let category = category_for_operation(&operation);
    let endpoint = request.uri().path().to_owned();

    // Stage 1: readiness. Nothing is served before startup completes.
    if !state.readiness.is_ready() {
        let code = GatewayErrorCode::NotReady;
        state.report_rejection(&RejectionReport {
            now_ms,
            started,
            user: None,
            operation: &operation,
            category,
            stage: GateStage::Readiness,
            code,
        });
        return rejection_response(code, &RejectionContext::default(), &state.product, None);
    }

    // Stage 2: credential parsing. Missing or non-bearer headers are
    // rejected before any store access.
    let raw_key = match bearer_key(&request) {
        Ok(key) => key,
        Err(code) => {
            state.report_rejection(&RejectionReport {
                now_ms,
                started,
                user: None,
                operation: &operation,
                category,
                stage: GateStage::CredentialParse,
                code,
            });
            return rejection_response(code, &RejectionContext::default(), &state.product, None);
        }
    };

    // Stage 3: key validation. Unknown, inactive, and expired keys are
    // indistinguishable to the caller.
    let user = match state.validator.validate(&raw_key, now_ms).await {
        Ok(user) => user,
        Err(err) => {
            let code = match err {
                ValidationError::InvalidCredential => GatewayErrorCode::InvalidCredential,
                ValidationError::Store(_) => GatewayErrorCode::Internal,
            };
            state.report_rejection(&RejectionReport {
                now_ms,
                started,
                user: None,
                operation: &operation,
                category,
                stage: GateStage::Validation,
                code,
            });
            return rejection_response(code, &RejectionContext::default(), &state.product, None);
        }
    };

    // Stage 4: quota. The attempt is recorded whether or not it is admitted;
    // backend failures reject rather than admit. The ledger event carries
    // the request path; the operation name travels on the audit event.
    match state.limiter.check_and_record(&user, category, &endpoint, now_ms).await {
        Ok(RateDecision::Admit { .. }) => {}
        Ok(RateDecision::Deny {
            current_usage,
            limit,
            reset_at_ms,
        }) => {
            let code = GatewayErrorCode::QuotaExceeded;
            state.report_rejection(&RejectionReport {
                now_ms,
                started,
                user: Some(&user),
                operation: &operation,
                category,
                stage: GateStage::Quota,
                code,
            });
            let context = RejectionContext {
                tier: Some(user.tier),
                category: Some(category.to_string()),
                current_usage: Some(current_usage),
                limit: Some(limit),
                reset_at_ms: Some(reset_at_ms),
            };
            return rejection_response(code, &context, &state.product, None);
        }
        Err(_) => {
            let code = GatewayErrorCode::Internal;
            state.report_rejection(&RejectionReport {
                now_ms,
                started,
                user: Some(&user),
                operation: &operation,
                category,
                stage: GateStage::Quota,
                code,
            });
            return rejection_response(code, &RejectionContext::default(), &state.product, None);
        }
    }

    // Stage 5: feature authorization.
    if !state.features.is_allowed(&operation, user.tier) {
        let code = GatewayErrorCode::FeatureDenied;
        state.report_rejection(&RejectionReport {
            now_ms,
            started,
            user: Some(&user),
            operation: &operation,
            category,
            stage: GateStage::Feature,
            code,
        });
        let context = RejectionContext {
            tier: Some(user.tier),
            category: Some(category.to_string()),
            ..RejectionContext::default()
        };
        let message =
            format!("feature '{category}' is not available on the {} plan", user.tier.as_str());
        return rejection_response(code, &context, &state.product, Some(message));
    }

    // Stage 6: forward. The response streams through untouched.
    state.report_admission(now_ms, started, &user, &operation, category);
    next.run(request).await
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns milliseconds since the Unix epoch.
fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Reads the operation name header, falling back to the unknown label.
fn operation_name(request: &Request) -> String {
    request
        .headers()
        .get(OPERATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| UNKNOWN_OPERATION.to_string(), ToString::to_string)
}

/// Extracts the bearer API key from the authorization header.
fn bearer_key(request: &Request) -> Result<String, GatewayErrorCode> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(GatewayErrorCode::AuthRequired)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(GatewayErrorCode::AuthRequired);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(GatewayErrorCode::AuthRequired);
    }
    Ok(token.to_string())
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

    use axum::body::Body;

    use super::*;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = Request::builder().method(Method::POST).uri("/mcp");
        if let Some(header) = value {
            builder = builder.header(AUTHORIZATION, header);
        }
        builder.body(Body::empty()).expect("build request")
    }

    #[test]
    fn bearer_key_accepts_case_insensitive_scheme() {
        let request = request_with_auth(Some("BEARER lg_example_key_000000001"));
        let key = bearer_key(&request).expect("parse bearer");
        assert_eq!(key, "lg_example_key_000000001");
    }

    #[test]
    fn bearer_key_rejects_missing_header() {
        let request = request_with_auth(None);
        let err = bearer_key(&request).expect_err("missing header must fail");
        assert_eq!(err, GatewayErrorCode::AuthRequired);
    }

    #[test]
    fn bearer_key_rejects_basic_scheme() {
        let request = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        let err = bearer_key(&request).expect_err("basic scheme must fail");
        assert_eq!(err, GatewayErrorCode::AuthRequired);
    }

    #[test]
    fn bearer_key_rejects_empty_token() {
        let request = request_with_auth(Some("Bearer "));
        let err = bearer_key(&request).expect_err("empty token must fail");
        assert_eq!(err, GatewayErrorCode::AuthRequired);
    }

    #[test]
    fn operation_name_defaults_to_unknown() {
        let request = request_with_auth(None);
        assert_eq!(operation_name(&request), UNKNOWN_OPERATION);
    }

    #[test]
    fn operation_name_reads_header() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/mcp")
            .header(OPERATION_HEADER, "search_bills")
            .body(Body::empty())
            .expect("build request");
        assert_eq!(operation_name(&request), "search_bills");
    }
}
