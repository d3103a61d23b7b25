// crates/lexgate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Credential Store
// Description: Durable CredentialStore backend using SQLite WAL.
// Purpose: Provide production-grade key storage and a durable usage ledger.
// Dependencies: lexgate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`lexgate_core::CredentialStore`]
//! implementation:
//! a key table indexed by hash plus an append-only `usage_events` ledger
//! with an indexed period-aggregate query. It is the durable,
//! multi-process-safe backend for the gateway's rate limiter; the
//! in-memory store remains the process-local fallback.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteCredentialStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
