// crates/lexgate-core/src/tier.rs
// ============================================================================
// Module: Subscription Tiers
// Description: Closed subscription tier model with boundary normalization.
// Purpose: Provide a single source of truth for tier identity.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The gateway models subscription tiers as a closed sum type. External
//! representations (config keys, stored rows, headers) are normalized into
//! [`Tier`] exactly once via [`Tier::parse`]; internal code never compares
//! raw tier strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Tier Model
// ============================================================================

/// Subscription tier determining quota and allowed feature set.
///
/// # Invariants
/// - The enumeration is closed; unknown external values fail normalization
///   instead of mapping onto a default tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Free tier: quota-limited entry level.
    Free,
    /// Pro tier: paid, higher quota.
    Pro,
    /// Enterprise tier: unlimited quota.
    Enterprise,
}

impl Tier {
    /// Normalizes an external tier representation into the closed model.
    ///
    /// Matching is ASCII case-insensitive and tolerates surrounding
    /// whitespace. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    /// Returns the stable wire label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Returns all tiers in ascending order of entitlement.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Free, Self::Pro, Self::Enterprise]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
