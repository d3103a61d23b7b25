// crates/lexgate-core/src/limiter.rs
// ============================================================================
// Module: Rate Limiter
// Description: Usage-based admission control with durable and memory backends.
// Purpose: Decide admit/deny per request and record usage for analytics.
// Dependencies: async-trait, lexgate-core credential/policy seams
// ============================================================================

//! ## Overview
//! The rate limiter answers one question per request: given the caller's
//! tier policy, is this request within quota? Two interchangeable backends
//! exist. [`LedgerRateLimiter`] is durable and cross-process-safe: it
//! records the attempt first (denied-over-quota attempts still count toward
//! telemetry) and then reads the period aggregate. [`MemoryRateLimiter`] is
//! a process-local fallback: it resets expired windows, checks, and
//! increments only on admit. An unlimited quota short-circuits comparison
//! entirely but still records usage.
//!
//! Backend failures are fail-closed: a storage error propagates as
//! [`RateLimitError::Backend`] and is never converted into a silent admit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::credential::CredentialStore;
use crate::credential::UsageEvent;
use crate::credential::UserContext;
use crate::policy::PolicyTable;
use crate::policy::QuotaLimit;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted.
    Admit {
        /// Usage counted against the quota after this request.
        current_usage: u64,
    },
    /// Request denied: quota consumed.
    Deny {
        /// Usage counted against the quota (capped at the limit).
        current_usage: u64,
        /// The tier's per-period quota.
        limit: u64,
        /// When the current period ends (milliseconds since epoch).
        reset_at_ms: u64,
    },
}

impl RateDecision {
    /// Returns true for admitted requests.
    #[must_use]
    pub const fn is_admit(&self) -> bool {
        matches!(self, Self::Admit { .. })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rate limiter errors.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Usage backend unreachable or failing; callers must treat this as a
    /// rejection, never an admit.
    #[error("usage backend error: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Limiter Trait
// ============================================================================

/// Admission control over a usage backend.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Checks the caller's quota and records the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the backend fails; the request must
    /// then be rejected (fail-closed), not admitted.
    async fn check_and_record(
        &self,
        user: &UserContext,
        feature: &str,
        endpoint: &str,
        now_ms: u64,
    ) -> Result<RateDecision, RateLimitError>;

    /// Returns the usage counted for the user in the current period.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the backend fails.
    async fn current_usage(&self, user_id: &str, now_ms: u64) -> Result<u64, RateLimitError>;
}

// ============================================================================
// SECTION: Durable Backend
// ============================================================================

/// Ledger-backed limiter: durable, multi-process-safe.
///
/// Periods are fixed windows derived from the policy table's period length:
/// `period_start = now - (now % period_ms)`.
pub struct LedgerRateLimiter {
    /// Usage ledger storage.
    store: Arc<dyn CredentialStore>,
    /// Static tier policy.
    policy: Arc<PolicyTable>,
}

impl LedgerRateLimiter {
    /// Builds a durable limiter over the given store and policy.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, policy: Arc<PolicyTable>) -> Self {
        Self {
            store,
            policy,
        }
    }

    /// Returns the start of the fixed window containing `now_ms`.
    fn period_start(&self, now_ms: u64) -> u64 {
        let period = self.policy.period_ms().max(1);
        now_ms - (now_ms % period)
    }
}

#[async_trait]
impl RateLimiter for LedgerRateLimiter {
    async fn check_and_record(
        &self,
        user: &UserContext,
        feature: &str,
        endpoint: &str,
        now_ms: u64,
    ) -> Result<RateDecision, RateLimitError> {
        // Record first: over-quota attempts still count toward telemetry,
        // and a request cancelled before this point has no effect.
        self.store
            .record_usage(UsageEvent {
                user_id: user.user_id.clone(),
                feature: feature.to_string(),
                endpoint: endpoint.to_string(),
                timestamp_ms: now_ms,
            })
            .await
            .map_err(|err| RateLimitError::Backend(err.to_string()))?;

        let period_start = self.period_start(now_ms);
        let used = self
            .store
            .usage_since(&user.user_id, period_start)
            .await
            .map_err(|err| RateLimitError::Backend(err.to_string()))?;

        let tier_policy = self.policy.policy_for(user.tier);
        match tier_policy.quota_per_period {
            QuotaLimit::Unlimited => Ok(RateDecision::Admit {
                current_usage: used,
            }),
            QuotaLimit::Limited(limit) => {
                if used <= limit {
                    Ok(RateDecision::Admit {
                        current_usage: used,
                    })
                } else {
                    Ok(RateDecision::Deny {
                        current_usage: used.min(limit),
                        limit,
                        reset_at_ms: period_start.saturating_add(self.policy.period_ms()),
                    })
                }
            }
        }
    }

    async fn current_usage(&self, user_id: &str, now_ms: u64) -> Result<u64, RateLimitError> {
        let period_start = self.period_start(now_ms);
        self.store
            .usage_since(user_id, period_start)
            .await
            .map_err(|err| RateLimitError::Backend(err.to_string()))
    }
}

// ============================================================================
// SECTION: In-Memory Fallback
// ============================================================================

/// Per-user window counter for the in-memory backend.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    /// Admitted requests in the current window.
    count: u64,
    /// When the window rolls over (milliseconds since epoch).
    reset_at_ms: u64,
}

/// Process-local fallback limiter.
///
/// # Invariants
/// - Counters are only touched under the map mutex; the lock is never held
///   across an await point.
/// - No cross-process consistency: behind a load balancer each worker
///   counts independently. The ledger backend is the only one with
///   cross-process correctness.
pub struct MemoryRateLimiter {
    /// Static tier policy.
    policy: Arc<PolicyTable>,
    /// Per-user window counters.
    counters: Mutex<BTreeMap<String, WindowCounter>>,
}

impl MemoryRateLimiter {
    /// Builds a process-local limiter over the given policy.
    #[must_use]
    pub fn new(policy: Arc<PolicyTable>) -> Self {
        Self {
            policy,
            counters: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check_and_record(
        &self,
        user: &UserContext,
        _feature: &str,
        _endpoint: &str,
        now_ms: u64,
    ) -> Result<RateDecision, RateLimitError> {
        let period = self.policy.period_ms().max(1);
        let tier_policy = self.policy.policy_for(user.tier);
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| RateLimitError::Backend("counter map lock poisoned".to_string()))?;
        let counter = counters.entry(user.user_id.clone()).or_insert(WindowCounter {
            count: 0,
            reset_at_ms: now_ms.saturating_add(period),
        });
        if now_ms >= counter.reset_at_ms {
            counter.count = 0;
            counter.reset_at_ms = now_ms.saturating_add(period);
        }
        match tier_policy.quota_per_period {
            QuotaLimit::Unlimited => {
                counter.count = counter.count.saturating_add(1);
                Ok(RateDecision::Admit {
                    current_usage: counter.count,
                })
            }
            QuotaLimit::Limited(limit) => {
                if counter.count < limit {
                    counter.count = counter.count.saturating_add(1);
                    Ok(RateDecision::Admit {
                        current_usage: counter.count,
                    })
                } else {
                    Ok(RateDecision::Deny {
                        current_usage: counter.count,
                        limit,
                        reset_at_ms: counter.reset_at_ms,
                    })
                }
            }
        }
    }

    async fn current_usage(&self, user_id: &str, now_ms: u64) -> Result<u64, RateLimitError> {
        let counters = self
            .counters
            .lock()
            .map_err(|_| RateLimitError::Backend("counter map lock poisoned".to_string()))?;
        Ok(counters
            .get(user_id)
            .filter(|counter| now_ms < counter.reset_at_ms)
            .map_or(0, |counter| counter.count))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
