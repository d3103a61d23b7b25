// crates/lexgate-core/src/credential.rs
// ============================================================================
// Module: Credential Store Seam
// Description: API key records, usage ledger events, and the store trait.
// Purpose: Provide the async seam between the gateway and durable storage.
// Dependencies: async-trait, serde, sha2
// ============================================================================

//! ## Overview
//! The credential store holds hashed API keys and an append-only usage
//! ledger. Raw keys are never stored: validation recomputes the SHA-256
//! hash via [`hash_key`] and looks the record up by hash. The store is also
//! the durable backend for the rate limiter; period aggregates are read via
//! [`CredentialStore::usage_since`]. [`MemoryCredentialStore`] is the
//! process-local implementation used for tests and single-process
//! deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::tier::Tier;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Authenticated caller context produced per request.
///
/// # Invariants
/// - Immutable for the lifetime of one request; never persisted by the
///   gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// Stable user identifier.
    pub user_id: String,
    /// Account email address.
    pub email: String,
    /// Subscription tier.
    pub tier: Tier,
    /// Account activity flag.
    pub active: bool,
}

// ============================================================================
// SECTION: Stored Records
// ============================================================================

/// Stored API key record.
///
/// # Invariants
/// - `key_hash` is a hex-encoded SHA-256 of the raw key; the raw key is
///   never stored.
/// - One active, non-expired record maps to exactly one [`UserContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Hex-encoded SHA-256 of the raw key.
    pub key_hash: String,
    /// Owning user identifier.
    pub user_id: String,
    /// Owning account email.
    pub email: String,
    /// Subscription tier at issuance.
    pub tier: Tier,
    /// Issuance timestamp (milliseconds since epoch).
    pub created_at_ms: u64,
    /// Optional expiry timestamp (milliseconds since epoch).
    pub expires_at_ms: Option<u64>,
    /// Whether the key is active.
    pub active: bool,
    /// Last successful validation timestamp (best-effort telemetry).
    pub last_used_at_ms: Option<u64>,
}

/// Append-only usage ledger event.
///
/// # Invariants
/// - Events are never mutated or deleted; period counts are derived by
///   summation over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// User the usage is attributed to.
    pub user_id: String,
    /// Feature/category label for analytics.
    pub feature: String,
    /// Endpoint path the request targeted.
    pub endpoint: String,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Credential store errors.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Underlying storage failure.
    #[error("credential store error: {0}")]
    Storage(String),
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Async seam between the gateway and credential/usage storage.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up a key record by its hex-encoded SHA-256 hash.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the lookup cannot be performed.
    async fn lookup_key(&self, key_hash: &str)
    -> Result<Option<ApiKeyRecord>, CredentialStoreError>;

    /// Updates the last-used timestamp for a key (best-effort telemetry).
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the update cannot be persisted.
    async fn touch_last_used(&self, key_hash: &str, now_ms: u64)
    -> Result<(), CredentialStoreError>;

    /// Inserts a new key record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the record cannot be persisted.
    async fn create_key(&self, record: ApiKeyRecord) -> Result<(), CredentialStoreError>;

    /// Deactivates a key record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the update cannot be persisted.
    async fn revoke_key(&self, key_hash: &str) -> Result<(), CredentialStoreError>;

    /// Appends a usage event to the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the event cannot be persisted.
    async fn record_usage(&self, event: UsageEvent) -> Result<(), CredentialStoreError>;

    /// Returns the total usage events for a user since the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the aggregate cannot be read.
    async fn usage_since(&self, user_id: &str, since_ms: u64)
    -> Result<u64, CredentialStoreError>;
}

// ============================================================================
// SECTION: Key Hashing
// ============================================================================

/// Computes the hex-encoded SHA-256 hash of a raw API key.
#[must_use]
pub fn hash_key(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory credential store (tests and single-process deployments).
///
/// # Invariants
/// - Locks are never held across await points.
#[derive(Default)]
pub struct MemoryCredentialStore {
    /// Key records indexed by key hash.
    keys: Mutex<BTreeMap<String, ApiKeyRecord>>,
    /// Append-only usage events.
    usage: Mutex<Vec<UsageEvent>>,
}

impl MemoryCredentialStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup_key(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, CredentialStoreError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| CredentialStoreError::Storage("key table lock poisoned".to_string()))?;
        Ok(keys.get(key_hash).cloned())
    }

    async fn touch_last_used(
        &self,
        key_hash: &str,
        now_ms: u64,
    ) -> Result<(), CredentialStoreError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| CredentialStoreError::Storage("key table lock poisoned".to_string()))?;
        if let Some(record) = keys.get_mut(key_hash) {
            record.last_used_at_ms = Some(now_ms);
        }
        Ok(())
    }

    async fn create_key(&self, record: ApiKeyRecord) -> Result<(), CredentialStoreError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| CredentialStoreError::Storage("key table lock poisoned".to_string()))?;
        keys.insert(record.key_hash.clone(), record);
        Ok(())
    }

    async fn revoke_key(&self, key_hash: &str) -> Result<(), CredentialStoreError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| CredentialStoreError::Storage("key table lock poisoned".to_string()))?;
        if let Some(record) = keys.get_mut(key_hash) {
            record.active = false;
        }
        Ok(())
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<(), CredentialStoreError> {
        let mut usage = self
            .usage
            .lock()
            .map_err(|_| CredentialStoreError::Storage("usage ledger lock poisoned".to_string()))?;
        usage.push(event);
        Ok(())
    }

    async fn usage_since(
        &self,
        user_id: &str,
        since_ms: u64,
    ) -> Result<u64, CredentialStoreError> {
        let usage = self
            .usage
            .lock()
            .map_err(|_| CredentialStoreError::Storage("usage ledger lock poisoned".to_string()))?;
        let count = usage
            .iter()
            .filter(|event| event.user_id == user_id && event.timestamp_ms >= since_ms)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
