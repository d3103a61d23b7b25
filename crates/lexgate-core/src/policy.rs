// crates/lexgate-core/src/policy.rs
// ============================================================================
// Module: Tier Policy Table
// Description: Static mapping from tier to quota and allowed feature set.
// Purpose: Provide read-only quota/feature policy loaded once at startup.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The policy table maps each [`Tier`] to a per-period quota and an allowed
//! feature set. It is pure data: loaded and validated once at process start,
//! read-only thereafter. A quota of [`QuotaLimit::Unlimited`] short-circuits
//! limit comparisons; a feature set of [`FeatureSet::All`] authorizes every
//! operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::tier::Tier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default accounting period: 30 days in milliseconds.
pub const DEFAULT_PERIOD_MS: u64 = 30 * 24 * 60 * 60 * 1_000;

/// Default per-period quota for the free tier.
const DEFAULT_FREE_QUOTA: u64 = 200;

/// Default per-period quota for the pro tier.
const DEFAULT_PRO_QUOTA: u64 = 5_000;

// ============================================================================
// SECTION: Quota Limits
// ============================================================================

/// Per-period request quota for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimit {
    /// At most this many admitted requests per period.
    Limited(u64),
    /// No limit; usage is still recorded for analytics.
    Unlimited,
}

impl QuotaLimit {
    /// Builds a quota from a raw configured value; any negative value is
    /// treated as the unlimited sentinel (`-1` by convention).
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        u64::try_from(raw).map_or(Self::Unlimited, Self::Limited)
    }

    /// Returns true when the quota never denies.
    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Returns the numeric limit when one exists.
    #[must_use]
    pub const fn limit(self) -> Option<u64> {
        match self {
            Self::Limited(value) => Some(value),
            Self::Unlimited => None,
        }
    }
}

// ============================================================================
// SECTION: Feature Sets
// ============================================================================

/// Allowed feature set for a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSet {
    /// Wildcard: every operation is authorized.
    All,
    /// Explicit set of operation names and/or category keys.
    Named(BTreeSet<String>),
}

impl FeatureSet {
    /// Builds a feature set from configured entries; `"*"` means wildcard.
    #[must_use]
    pub fn from_entries(entries: &[String]) -> Self {
        if entries.iter().any(|entry| entry == "*") {
            return Self::All;
        }
        Self::Named(entries.iter().map(|entry| entry.trim().to_ascii_lowercase()).collect())
    }

    /// Returns true when the set authorizes the operation or its category.
    #[must_use]
    pub fn allows(&self, operation: &str, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(names) => {
                names.contains(&operation.to_ascii_lowercase()) || names.contains(category)
            }
        }
    }
}

// ============================================================================
// SECTION: Tier Policy
// ============================================================================

/// Quota and feature policy for a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    /// Maximum admitted requests per accounting period.
    pub quota_per_period: QuotaLimit,
    /// Operations/categories the tier may invoke.
    pub allowed_features: FeatureSet,
}

/// Static policy table mapping every tier to its policy.
///
/// # Invariants
/// - Every [`Tier`] variant has an entry once [`PolicyTable::validate`]
///   passes.
/// - The accounting period is non-zero.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    /// Per-tier policies.
    policies: BTreeMap<Tier, TierPolicy>,
    /// Accounting period length in milliseconds.
    period_ms: u64,
}

impl PolicyTable {
    /// Builds an empty table with the given accounting period.
    #[must_use]
    pub const fn new(period_ms: u64) -> Self {
        Self {
            policies: BTreeMap::new(),
            period_ms,
        }
    }

    /// Returns the table with the policy installed for the tier.
    #[must_use]
    pub fn with_policy(mut self, tier: Tier, policy: TierPolicy) -> Self {
        self.policies.insert(tier, policy);
        self
    }

    /// Returns the table with the accounting period replaced.
    #[must_use]
    pub const fn with_period_ms(mut self, period_ms: u64) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Returns the policy for the tier.
    ///
    /// Falls back to a deny-everything policy for tiers missing from the
    /// table, which cannot happen after [`PolicyTable::validate`].
    #[must_use]
    pub fn policy_for(&self, tier: Tier) -> TierPolicy {
        self.policies.get(&tier).cloned().unwrap_or(TierPolicy {
            quota_per_period: QuotaLimit::Limited(0),
            allowed_features: FeatureSet::Named(BTreeSet::new()),
        })
    }

    /// Returns the accounting period in milliseconds.
    #[must_use]
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Validates completeness of the table.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the period is zero or a tier has no
    /// policy entry.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.period_ms == 0 {
            return Err(PolicyError::InvalidPeriod);
        }
        for tier in Tier::all() {
            if !self.policies.contains_key(&tier) {
                return Err(PolicyError::MissingTier(tier));
            }
        }
        Ok(())
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD_MS)
            .with_policy(Tier::Free, TierPolicy {
                quota_per_period: QuotaLimit::Limited(DEFAULT_FREE_QUOTA),
                allowed_features: FeatureSet::All,
            })
            .with_policy(Tier::Pro, TierPolicy {
                quota_per_period: QuotaLimit::Limited(DEFAULT_PRO_QUOTA),
                allowed_features: FeatureSet::All,
            })
            .with_policy(Tier::Enterprise, TierPolicy {
                quota_per_period: QuotaLimit::Unlimited,
                allowed_features: FeatureSet::All,
            })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy table validation errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A tier has no entry in the table.
    #[error("policy table missing tier: {0}")]
    MissingTier(Tier),
    /// The accounting period is zero.
    #[error("policy period must be non-zero")]
    InvalidPeriod,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
