//! Configuration Module - TOML-based Oracle Configuration
//!
//! Loads and validates configuration from `config.toml`. Request-level
//! defaults (minimum sources, trade age, decimals...) live here so
//! operators can tune them without touching the pipeline. Private keys
//! never appear in the file; only the name of the variable holding
//! them does.

pub mod loader;

use serde::Deserialize;

use crate::domain::types::AggregationType;

/// Top-level oracle configuration.
///
/// Every section is optional in the file and falls back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Aggregation and validation defaults.
  #[serde(default)]
  pub oracle: OracleConfig,
  /// Outbound HTTP behaviour.
  #[serde(default)]
  pub http: HttpConfig,
  /// Exchange selection.
  #[serde(default)]
  pub exchanges: ExchangesConfig,
  /// Key sources.
  #[serde(default)]
  pub signer: SignerConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Defaults applied when a request leaves a field unset.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
  /// Minimum usable quotes per pair.
  #[serde(default = "default_min_sources")]
  pub min_sources: usize,
  /// Maximum age of an exchange's last trade (ms).
  #[serde(default = "default_trade_age_limit_ms")]
  pub trade_age_limit_ms: u64,
  /// Lifetime of a cached quote (ms).
  #[serde(default = "default_cache_duration_ms")]
  pub cache_duration_ms: u64,
  /// Fixed-point decimals when the pair names none.
  #[serde(default = "default_decimals")]
  pub default_decimals: u32,
  /// Aggregation used when the request names none.
  #[serde(default = "default_aggregation")]
  pub default_aggregation: AggregationType,
  /// Maximum client/oracle deviation (percent).
  #[serde(default = "default_max_validation_diff")]
  pub max_validation_diff: f64,
  /// Window for accepting a client timestamp (ms).
  #[serde(default = "default_client_timestamp_tolerance_ms")]
  pub client_timestamp_tolerance_ms: u64,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  /// Per-request timeout (ms).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum in-flight requests across all exchanges.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Retries on transport errors and 5xx.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay of the exponential backoff (ms).
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
  /// User-agent sent to exchanges.
  #[serde(default = "default_user_agent")]
  pub user_agent: String,
}

/// Exchange selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangesConfig {
  /// Registry ids to load. Empty means every known exchange.
  #[serde(default)]
  pub enabled: Vec<String>,
}

/// Where signing keys come from.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
  /// Environment variable holding the hex secp256k1 private key.
  #[serde(default = "default_secp256k1_key_env")]
  pub secp256k1_key_env: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      min_sources: default_min_sources(),
      trade_age_limit_ms: default_trade_age_limit_ms(),
      cache_duration_ms: default_cache_duration_ms(),
      default_decimals: default_decimals(),
      default_aggregation: default_aggregation(),
      max_validation_diff: default_max_validation_diff(),
      client_timestamp_tolerance_ms: default_client_timestamp_tolerance_ms(),
    }
  }
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
      max_concurrent: default_max_concurrent(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay_ms(),
      user_agent: default_user_agent(),
    }
  }
}

impl Default for SignerConfig {
  fn default() -> Self {
    Self {
      secp256k1_key_env: default_secp256k1_key_env(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "price-oracle".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_min_sources() -> usize {
  3
}

fn default_trade_age_limit_ms() -> u64 {
  300_000 // 5 min
}

fn default_cache_duration_ms() -> u64 {
  crate::usecases::quote_cache::DEFAULT_CACHE_DURATION_MS
}

fn default_decimals() -> u32 {
  8
}

fn default_aggregation() -> AggregationType {
  AggregationType::Median
}

fn default_max_validation_diff() -> f64 {
  crate::domain::reconciler::DEFAULT_MAX_VALIDATION_DIFF
}

fn default_client_timestamp_tolerance_ms() -> u64 {
  crate::domain::reconciler::CLIENT_TIMESTAMP_TOLERANCE_MS
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_concurrent() -> usize {
  32
}

fn default_max_retries() -> u32 {
  2
}

fn default_retry_base_delay_ms() -> u64 {
  200
}

fn default_user_agent() -> String {
  crate::usecases::quote_fetcher::DEFAULT_USER_AGENT.to_string()
}

fn default_secp256k1_key_env() -> String {
  "ORACLE_SECP256K1_KEY".to_string()
}
