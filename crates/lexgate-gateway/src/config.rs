// crates/lexgate-gateway/src/config.rs
// ============================================================================
// Module: Gateway Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing for gating policy.
// Dependencies: lexgate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from TOML. Tier limits are declared per tier name
//! and normalized into a [`PolicyTable`]; unknown tier names, zero periods,
//! and missing store paths fail closed at load time rather than at request
//! time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use lexgate_core::DEFAULT_PERIOD_MS;
use lexgate_core::FeatureSet;
use lexgate_core::PolicyTable;
use lexgate_core::QuotaLimit;
use lexgate_core::Tier;
use lexgate_core::TierPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default bind address when none is configured.
const DEFAULT_BIND: &str = "127.0.0.1:8991";
/// Default tool endpoint path prefix.
const DEFAULT_TOOL_PATH: &str = "/mcp";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration load and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration is internally inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the gateway listens on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Path prefix for tool-protocol traffic subject to gating.
    #[serde(default = "default_tool_path")]
    pub tool_path: String,
}

/// Default bind address.
fn default_bind() -> SocketAddr {
    // The literal is a compile-time constant and always parses.
    DEFAULT_BIND.parse().unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8991)))
}

/// Default tool path prefix.
fn default_tool_path() -> String {
    DEFAULT_TOOL_PATH.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            tool_path: default_tool_path(),
        }
    }
}

/// Credential store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-memory store, no persistence.
    Memory,
    /// SQLite file-backed store.
    Sqlite,
}

/// Credential store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Database path; required for the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Default store backend.
const fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

/// Per-tier limit declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierLimitConfig {
    /// Calls allowed per period; negative means unlimited.
    pub quota_per_period: i64,
    /// Allowed feature names and categories; `"*"` grants everything.
    #[serde(default = "default_features")]
    pub allowed_features: Vec<String>,
}

/// Default feature grant (everything).
fn default_features() -> Vec<String> {
    vec!["*".to_string()]
}

/// Quota and feature limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Accounting period length in milliseconds.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Per-tier overrides keyed by tier name.
    #[serde(default)]
    pub tiers: BTreeMap<String, TierLimitConfig>,
}

/// Default accounting period.
const fn default_period_ms() -> u64 {
    DEFAULT_PERIOD_MS
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            tiers: BTreeMap::new(),
        }
    }
}

/// Commercial guidance links surfaced in rejection payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Where to obtain an API key.
    #[serde(default)]
    pub signup_url: Option<String>,
    /// Where to upgrade the current plan.
    #[serde(default)]
    pub upgrade_url: Option<String>,
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server bind settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Quota and feature limit settings.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Commercial guidance links.
    #[serde(default)]
    pub product: ProductConfig,
}

impl GatewayConfig {
    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.tool_path.is_empty() || !self.server.tool_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "server.tool_path must be a non-empty absolute path".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            return Err(ConfigError::Invalid(
                "store.path is required for the sqlite backend".to_string(),
            ));
        }
        if self.limits.period_ms == 0 {
            return Err(ConfigError::Invalid("limits.period_ms must be nonzero".to_string()));
        }
        for name in self.limits.tiers.keys() {
            if Tier::parse(name).is_none() {
                return Err(ConfigError::Invalid(format!("unknown tier in limits: {name}")));
            }
        }
        Ok(())
    }

    /// Builds the effective policy table, applying tier overrides on top of
    /// the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a tier name cannot be normalized.
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigError> {
        let mut table = PolicyTable::default().with_period_ms(self.limits.period_ms);
        for (name, limit) in &self.limits.tiers {
            let tier = Tier::parse(name)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown tier in limits: {name}")))?;
            let policy = TierPolicy {
                quota_per_period: QuotaLimit::from_raw(limit.quota_per_period),
                allowed_features: FeatureSet::from_entries(&limit.allowed_features),
            };
            table = table.with_policy(tier, policy);
        }
        Ok(table)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
