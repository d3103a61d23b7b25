// crates/lexgate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Credential Store
// Description: Key table and usage ledger over a WAL SQLite database.
// Purpose: Persist hashed API keys and usage events for quota accounting.
// Dependencies: lexgate-core, rusqlite, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`CredentialStore`] over `SQLite`. Keys are stored
//! by hex-encoded SHA-256 hash only; raw keys never reach this layer. Usage
//! events land in an append-only ledger table with an index on
//! `(user_id, timestamp_ms)` so period aggregates stay cheap. The
//! connection sits behind a mutex with a busy timeout; callers run queries
//! on the async seam without holding the lock across await points.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use lexgate_core::ApiKeyRecord;
use lexgate_core::CredentialStore;
use lexgate_core::CredentialStoreError;
use lexgate_core::Tier;
use lexgate_core::UsageEvent;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema bootstrap for the key table and usage ledger.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS api_keys (key_hash TEXT PRIMARY KEY, \
                          user_id TEXT NOT NULL, email TEXT NOT NULL, tier TEXT NOT NULL, \
                          created_at_ms INTEGER NOT NULL, expires_at_ms INTEGER, active INTEGER \
                          NOT NULL, last_used_at_ms INTEGER); CREATE TABLE IF NOT EXISTS \
                          usage_events (user_id TEXT NOT NULL, feature TEXT NOT NULL, endpoint \
                          TEXT NOT NULL, timestamp_ms INTEGER NOT NULL); CREATE INDEX IF NOT \
                          EXISTS idx_usage_events_user_time ON usage_events(user_id, \
                          timestamp_ms);";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` credential store.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    /// Builds a config with the default busy timeout.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` credential store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// `SQLite` engine error.
    #[error("sqlite credential store error: {0}")]
    Db(String),
    /// Stored row holds data the closed model rejects.
    #[error("sqlite credential store invalid data: {0}")]
    InvalidData(String),
}

impl From<SqliteStoreError> for CredentialStoreError {
    fn from(err: SqliteStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed credential store and usage ledger.
pub struct SqliteCredentialStore {
    /// Shared `SQLite` connection.
    connection: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Opens the store, applying pragmas and bootstrapping the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let conn = Connection::open(&config.path)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode = wal; PRAGMA synchronous = full;")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        conn.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(Self {
            connection: Mutex::new(conn),
        })
    }

    /// Runs a closure with the locked connection.
    fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, CredentialStoreError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| CredentialStoreError::Storage("connection lock poisoned".to_string()))?;
        op(&conn).map_err(CredentialStoreError::from)
    }
}

/// Maps a stored row onto an [`ApiKeyRecord`].
fn row_to_record(row: &rusqlite::Row<'_>) -> Result<RawKeyRow, rusqlite::Error> {
    Ok(RawKeyRow {
        key_hash: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        tier: row.get(3)?,
        created_at_ms: row.get(4)?,
        expires_at_ms: row.get(5)?,
        active: row.get(6)?,
        last_used_at_ms: row.get(7)?,
    })
}

/// Raw row shape before tier normalization.
struct RawKeyRow {
    /// Hex-encoded SHA-256 of the raw key.
    key_hash: String,
    /// Owning user identifier.
    user_id: String,
    /// Owning account email.
    email: String,
    /// Stored tier label.
    tier: String,
    /// Issuance timestamp.
    created_at_ms: i64,
    /// Optional expiry timestamp.
    expires_at_ms: Option<i64>,
    /// Activity flag.
    active: bool,
    /// Last validation timestamp.
    last_used_at_ms: Option<i64>,
}

impl RawKeyRow {
    /// Normalizes the raw row into the closed record model.
    fn into_record(self) -> Result<ApiKeyRecord, SqliteStoreError> {
        let tier = Tier::parse(&self.tier)
            .ok_or_else(|| SqliteStoreError::InvalidData(format!("unknown tier: {}", self.tier)))?;
        Ok(ApiKeyRecord {
            key_hash: self.key_hash,
            user_id: self.user_id,
            email: self.email,
            tier,
            created_at_ms: u64::try_from(self.created_at_ms).unwrap_or(0),
            expires_at_ms: self.expires_at_ms.map(|ms| u64::try_from(ms).unwrap_or(0)),
            active: self.active,
            last_used_at_ms: self.last_used_at_ms.map(|ms| u64::try_from(ms).unwrap_or(0)),
        })
    }
}

/// Clamps a timestamp for storage as a signed integer.
fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn lookup_key(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, CredentialStoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT key_hash, user_id, email, tier, created_at_ms, expires_at_ms, \
                     active, last_used_at_ms FROM api_keys WHERE key_hash = ?1",
                    params![key_hash],
                    row_to_record,
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            row.map(RawKeyRow::into_record).transpose()
        })
    }

    async fn touch_last_used(
        &self,
        key_hash: &str,
        now_ms: u64,
    ) -> Result<(), CredentialStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE api_keys SET last_used_at_ms = ?2 WHERE key_hash = ?1",
                params![key_hash, clamp_ms(now_ms)],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        })
    }

    async fn create_key(&self, record: ApiKeyRecord) -> Result<(), CredentialStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO api_keys (key_hash, user_id, email, tier, \
                 created_at_ms, expires_at_ms, active, last_used_at_ms) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.key_hash,
                    record.user_id,
                    record.email,
                    record.tier.as_str(),
                    clamp_ms(record.created_at_ms),
                    record.expires_at_ms.map(clamp_ms),
                    record.active,
                    record.last_used_at_ms.map(clamp_ms),
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        })
    }

    async fn revoke_key(&self, key_hash: &str) -> Result<(), CredentialStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE api_keys SET active = 0 WHERE key_hash = ?1",
                params![key_hash],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        })
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<(), CredentialStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO usage_events (user_id, feature, endpoint, timestamp_ms) VALUES \
                 (?1, ?2, ?3, ?4)",
                params![event.user_id, event.feature, event.endpoint, clamp_ms(event.timestamp_ms)],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        })
    }

    async fn usage_since(
        &self,
        user_id: &str,
        since_ms: u64,
    ) -> Result<u64, CredentialStoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM usage_events WHERE user_id = ?1 AND timestamp_ms >= ?2",
                    params![user_id, clamp_ms(since_ms)],
                    |row| row.get(0),
                )
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }
}
