// crates/lexgate-core/src/error.rs
// ============================================================================
// Module: Gateway Error Codes
// Description: Closed rejection taxonomy with stable wire codes.
// Purpose: Map every gate rejection to a JSON-RPC code and HTTP status.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every rejection the gateway emits carries one of these codes. The
//! enumeration is closed and the wire values are stable; internal error
//! detail is never exposed through them. `InvalidCredential` deliberately
//! covers unknown, inactive, and expired keys alike.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Closed rejection taxonomy for gate decisions.
///
/// # Invariants
/// - JSON-RPC codes and HTTP statuses are stable wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// No credential presented (missing header or non-Bearer scheme).
    AuthRequired,
    /// Credential present but rejected (unknown/inactive/expired, merged).
    InvalidCredential,
    /// Gateway up but inner application not yet initialized.
    NotReady,
    /// Tier quota consumed for the current period.
    QuotaExceeded,
    /// Tier lacks the requested capability.
    FeatureDenied,
    /// Store unreachable or unexpected failure (fail-closed).
    Internal,
}

impl GatewayErrorCode {
    /// Returns the JSON-RPC error code for the rejection.
    #[must_use]
    pub const fn jsonrpc_code(self) -> i64 {
        match self {
            Self::AuthRequired => -32_001,
            Self::InvalidCredential => -32_002,
            Self::FeatureDenied => -32_003,
            Self::QuotaExceeded => -32_004,
            Self::NotReady => -32_005,
            Self::Internal => -32_050,
        }
    }

    /// Returns the HTTP status accompanying the rejection.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::AuthRequired | Self::InvalidCredential => 401,
            Self::FeatureDenied => 403,
            Self::QuotaExceeded => 429,
            Self::NotReady => 503,
            Self::Internal => 500,
        }
    }

    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::InvalidCredential => "invalid_credential",
            Self::NotReady => "not_ready",
            Self::QuotaExceeded => "quota_exceeded",
            Self::FeatureDenied => "feature_denied",
            Self::Internal => "internal",
        }
    }

    /// Returns the default user-visible message for the rejection.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::AuthRequired => "authentication required",
            Self::InvalidCredential => "invalid credential",
            Self::NotReady => "service starting, retry shortly",
            Self::QuotaExceeded => "quota exceeded for current period",
            Self::FeatureDenied => "operation not available on current tier",
            Self::Internal => "internal error",
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
