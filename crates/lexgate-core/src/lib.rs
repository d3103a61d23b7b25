// crates/lexgate-core/src/lib.rs
// ============================================================================
// Module: Lexgate Core
// Description: Gating primitives for the Lexgate tool-serving gateway.
// Purpose: Provide tier policy, credential validation, rate limiting, and
//          readiness tracking for request interception.
// Dependencies: async-trait, serde, sha2, thiserror, tokio
// ============================================================================

//! ## Overview
//! Lexgate Core defines the access-control building blocks the gateway
//! sequences on every tool-invocation request: the closed [`Tier`] model and
//! its static [`PolicyTable`], the [`CredentialStore`] seam with SHA-256 key
//! hashing, the fail-closed [`KeyValidator`], the dual-backend
//! [`RateLimiter`], the [`FeatureAuthorizer`], and the [`ReadinessGate`].
//! All decisions are fail-closed; storage failures surface as errors rather
//! than silent admits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credential;
pub mod error;
pub mod features;
pub mod limiter;
pub mod policy;
pub mod readiness;
pub mod tier;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::ApiKeyRecord;
pub use credential::CredentialStore;
pub use credential::CredentialStoreError;
pub use credential::MemoryCredentialStore;
pub use credential::UsageEvent;
pub use credential::UserContext;
pub use credential::hash_key;
pub use error::GatewayErrorCode;
pub use features::FeatureAuthorizer;
pub use features::GENERAL_CATEGORY;
pub use features::category_for_operation;
pub use limiter::LedgerRateLimiter;
pub use limiter::MemoryRateLimiter;
pub use limiter::RateDecision;
pub use limiter::RateLimitError;
pub use limiter::RateLimiter;
pub use policy::DEFAULT_PERIOD_MS;
pub use policy::FeatureSet;
pub use policy::PolicyError;
pub use policy::PolicyTable;
pub use policy::QuotaLimit;
pub use policy::TierPolicy;
pub use readiness::ReadinessGate;
pub use readiness::ReadinessState;
pub use tier::Tier;
pub use validator::KeyValidator;
pub use validator::ValidationError;
