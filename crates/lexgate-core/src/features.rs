// crates/lexgate-core/src/features.rs
// ============================================================================
// Module: Feature Authorization
// Description: Operation category inference and tier-based feature gating.
// Purpose: Decide whether an operation is covered by a tier's feature set.
// Dependencies: lexgate-core policy/tier seams
// ============================================================================

//! ## Overview
//! Individual tool operations are numerous; their category is inferred from
//! naming convention. [`category_for_operation`] is deterministic,
//! side-effect-free, and total: legislative keyword substrings are matched
//! in a fixed order and anything unmapped falls into the single
//! [`GENERAL_CATEGORY`] bucket. The [`FeatureAuthorizer`] checks the
//! operation (exact name or derived category) against the tier's allowed
//! feature set; a wildcard set always authorizes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::policy::PolicyTable;
use crate::tier::Tier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fallback category for operations matching no known keyword.
pub const GENERAL_CATEGORY: &str = "general";

/// Keyword substrings mapped to category keys, matched in this order.
///
/// The first matching keyword wins, which keeps inference deterministic for
/// names containing several keywords (e.g. `get_bill_amendments`).
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("bill", "bills"),
    ("amendment", "amendments"),
    ("member", "members"),
    ("committee", "committees"),
    ("nomination", "nominations"),
    ("treat", "treaties"),
    ("hearing", "hearings"),
    ("vote", "votes"),
    ("summar", "summaries"),
    ("congress", "congress"),
];

// ============================================================================
// SECTION: Category Inference
// ============================================================================

/// Derives the category key for an operation name.
///
/// Inference is best-effort and never fails: unmapped operations default to
/// [`GENERAL_CATEGORY`].
#[must_use]
pub fn category_for_operation(operation: &str) -> &'static str {
    let lowered = operation.to_ascii_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if lowered.contains(keyword) {
            return category;
        }
    }
    GENERAL_CATEGORY
}

// ============================================================================
// SECTION: Authorizer
// ============================================================================

/// Tier-based feature authorization over the static policy table.
pub struct FeatureAuthorizer {
    /// Static tier policy.
    policy: Arc<PolicyTable>,
}

impl FeatureAuthorizer {
    /// Builds an authorizer over the given policy table.
    #[must_use]
    pub fn new(policy: Arc<PolicyTable>) -> Self {
        Self {
            policy,
        }
    }

    /// Returns true when the tier may invoke the operation.
    #[must_use]
    pub fn is_allowed(&self, operation: &str, tier: Tier) -> bool {
        let category = category_for_operation(operation);
        self.policy.policy_for(tier).allowed_features.allows(operation, category)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
