// crates/lexgate-core/src/validator.rs
// ============================================================================
// Module: Key Validator
// Description: API key validation against the credential store.
// Purpose: Produce a UserContext per request with fail-closed semantics.
// Dependencies: lexgate-core credential seam, tokio
// ============================================================================

//! ## Overview
//! The key validator normalizes a bearer credential, rejects malformed keys
//! before any store round-trip, and merges unknown/inactive/expired records
//! into a single [`ValidationError::InvalidCredential`] so callers cannot
//! distinguish which check failed. On success it updates the record's
//! last-used timestamp asynchronously; that update is best-effort telemetry
//! and never blocks or fails the validation result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::credential::CredentialStore;
use crate::credential::UserContext;
use crate::credential::hash_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Issued API keys carry this prefix.
pub const KEY_PREFIX: &str = "lg_";

/// Minimum length of a well-formed raw key, prefix included.
pub const MIN_KEY_LENGTH: usize = 24;

/// Upper bound on credential length accepted before hashing.
const MAX_KEY_LENGTH: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Credential rejected: malformed, unknown, inactive, or expired.
    ///
    /// The causes are deliberately indistinguishable to the caller.
    #[error("invalid credential")]
    InvalidCredential,
    /// Credential store unreachable or failing.
    #[error("credential store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validates raw API keys against the credential store.
pub struct KeyValidator {
    /// Backing credential store.
    store: Arc<dyn CredentialStore>,
}

impl KeyValidator {
    /// Builds a validator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
        }
    }

    /// Validates a raw key and produces the caller's [`UserContext`].
    ///
    /// Malformed keys are rejected without touching the store. A store miss,
    /// an inactive record, and an expired record all fail identically. On
    /// success the record's last-used timestamp is updated in a detached
    /// task; failures of that update are swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCredential`] for rejected keys and
    /// [`ValidationError::Store`] when the store itself fails.
    pub async fn validate(
        &self,
        raw_key: &str,
        now_ms: u64,
    ) -> Result<UserContext, ValidationError> {
        if !is_well_formed(raw_key) {
            return Err(ValidationError::InvalidCredential);
        }
        let key_hash = hash_key(raw_key);
        let record = self
            .store
            .lookup_key(&key_hash)
            .await
            .map_err(|err| ValidationError::Store(err.to_string()))?;
        let Some(record) = record else {
            return Err(ValidationError::InvalidCredential);
        };
        if !record.active {
            return Err(ValidationError::InvalidCredential);
        }
        if record.expires_at_ms.is_some_and(|expiry| expiry <= now_ms) {
            return Err(ValidationError::InvalidCredential);
        }

        let store = Arc::clone(&self.store);
        let touched_hash = key_hash;
        drop(tokio::spawn(async move {
            // Best-effort bookkeeping; failures must not affect validation.
            let _ = store.touch_last_used(&touched_hash, now_ms).await;
        }));

        Ok(UserContext {
            user_id: record.user_id,
            email: record.email,
            tier: record.tier,
            active: record.active,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the raw key has the issued shape.
///
/// Well-formed keys carry the `lg_` prefix, stay within length bounds, and
/// contain only ASCII alphanumerics and underscores.
fn is_well_formed(raw_key: &str) -> bool {
    raw_key.len() >= MIN_KEY_LENGTH
        && raw_key.len() <= MAX_KEY_LENGTH
        && raw_key.starts_with(KEY_PREFIX)
        && raw_key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
