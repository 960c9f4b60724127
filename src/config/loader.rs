//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::domain::math::MAX_DECIMALS;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    min_sources = config.oracle.min_sources,
    trade_age_limit_ms = config.oracle.trade_age_limit_ms,
    cache_duration_ms = config.oracle.cache_duration_ms,
    exchanges = config.exchanges.enabled.len(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - At least one required source
/// - Non-zero time windows
/// - Non-negative validation tolerance
/// - Sensible HTTP limits
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let oracle = &config.oracle;

  anyhow::ensure!(
    oracle.min_sources >= 1,
    "min_sources must be at least 1, got {}",
    oracle.min_sources
  );
  anyhow::ensure!(
    oracle.trade_age_limit_ms > 0,
    "trade_age_limit_ms must be positive"
  );
  anyhow::ensure!(
    oracle.cache_duration_ms > 0,
    "cache_duration_ms must be positive"
  );
  anyhow::ensure!(
    oracle.default_decimals <= MAX_DECIMALS,
    "default_decimals must be at most {MAX_DECIMALS}, got {}",
    oracle.default_decimals
  );
  anyhow::ensure!(
    oracle.max_validation_diff.is_finite() && oracle.max_validation_diff >= 0.0,
    "max_validation_diff must be a non-negative number, got {}",
    oracle.max_validation_diff
  );

  anyhow::ensure!(config.http.timeout_ms > 0, "http.timeout_ms must be positive");
  anyhow::ensure!(
    config.http.max_concurrent > 0,
    "http.max_concurrent must be positive"
  );

  for id in &config.exchanges.enabled {
    anyhow::ensure!(!id.trim().is_empty(), "Exchange ids must not be empty");
  }

  anyhow::ensure!(
    !config.signer.secp256k1_key_env.is_empty(),
    "signer.secp256k1_key_env must not be empty"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::types::AggregationType;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.oracle.min_sources, 3);
    assert_eq!(config.oracle.trade_age_limit_ms, 300_000);
    assert_eq!(config.oracle.cache_duration_ms, 60_000);
    assert_eq!(config.oracle.default_decimals, 8);
    assert_eq!(config.oracle.default_aggregation, AggregationType::Median);
    assert_eq!(config.oracle.max_validation_diff, 0.05);
    assert!(config.exchanges.enabled.is_empty());
    assert_eq!(config.signer.secp256k1_key_env, "ORACLE_SECP256K1_KEY");
  }

  #[test]
  fn test_partial_sections_override() {
    let config = parse_config(
      r#"
        [oracle]
        min_sources = 2
        default_aggregation = "mean"

        [exchanges]
        enabled = ["BNC", "KRK"]
      "#,
    )
    .unwrap();
    assert_eq!(config.oracle.min_sources, 2);
    assert_eq!(config.oracle.default_aggregation, AggregationType::Mean);
    assert_eq!(config.oracle.trade_age_limit_ms, 300_000);
    assert_eq!(config.exchanges.enabled, vec!["BNC", "KRK"]);
  }

  #[test]
  fn test_rejects_zero_min_sources() {
    let err = parse_config("[oracle]\nmin_sources = 0\n").unwrap_err();
    assert!(format!("{err:#}").contains("min_sources"));
  }

  #[test]
  fn test_rejects_negative_validation_diff() {
    assert!(parse_config("[oracle]\nmax_validation_diff = -1.0\n").is_err());
  }

  #[test]
  fn test_default_decimals_capped_at_u128_range() {
    assert!(parse_config("[oracle]\ndefault_decimals = 38\n").is_ok());
    let err = parse_config("[oracle]\ndefault_decimals = 39\n").unwrap_err();
    assert!(format!("{err:#}").contains("default_decimals"));
  }

  #[test]
  fn test_rejects_unknown_aggregation() {
    assert!(parse_config("[oracle]\ndefault_aggregation = \"mode\"\n").is_err());
  }
}
