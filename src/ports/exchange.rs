//! Exchange Adapter Port - Per-venue Request and Response Shape
//!
//! Each exchange publishes its last trade under a different URL and
//! JSON layout. An adapter hides both behind one interface so the
//! fetcher can treat every venue the same way. The registry holds the
//! adapters a deployment knows about.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::error::{OracleError, OracleResult};

/// Last trade extracted from an exchange response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTrade {
  /// Trade price; may be NaN when the venue returns garbage.
  pub price: f64,
  /// Trade time (Unix ms).
  pub timestamp_ms: u64,
}

/// Stateless description of one exchange.
pub trait ExchangeAdapter: Send + Sync + 'static {
  /// Short registry id (e.g. `BNC`).
  fn id(&self) -> &str;

  /// Human-readable name for logs.
  fn name(&self) -> &str;

  /// Last-trade endpoint for the pair.
  fn url_for(&self, from: &str, to: &str) -> String;

  /// Pull the last trade out of a parsed response.
  ///
  /// # Errors
  /// When the response does not have the expected shape.
  fn extract(&self, response: &Value) -> anyhow::Result<RawTrade>;
}

/// Adapters keyed by id, built once at startup.
#[derive(Clone, Default)]
pub struct ExchangeRegistry {
  adapters: Vec<Arc<dyn ExchangeAdapter>>,
}

impl ExchangeRegistry {
  pub fn new(adapters: Vec<Arc<dyn ExchangeAdapter>>) -> Self {
    Self { adapters }
  }

  /// Look up one adapter.
  ///
  /// # Errors
  /// `AdapterNotFound` for an unknown id.
  pub fn get(&self, id: &str) -> OracleResult<Arc<dyn ExchangeAdapter>> {
    self
      .adapters
      .iter()
      .find(|a| a.id() == id)
      .cloned()
      .ok_or_else(|| OracleError::AdapterNotFound(id.to_string()))
  }

  /// Adapters named by `allow_list`, or all of them.
  ///
  /// Unknown ids are logged and skipped.
  pub fn select(&self, allow_list: Option<&[String]>) -> Vec<Arc<dyn ExchangeAdapter>> {
    let Some(ids) = allow_list else {
      return self.adapters.clone();
    };

    let mut selected: Vec<Arc<dyn ExchangeAdapter>> = Vec::with_capacity(ids.len());
    for id in ids {
      match self.get(id) {
        Ok(adapter) if !selected.iter().any(|a| a.id() == adapter.id()) => selected.push(adapter),
        Ok(_) => {}
        Err(e) => warn!(exchange = %id, error = %e, "Skipping exchange"),
      }
    }
    selected
  }

  /// Keep only the adapters whose id is in `enabled`.
  pub fn restrict(self, enabled: &[String]) -> Self {
    Self {
      adapters: self
        .adapters
        .into_iter()
        .filter(|a| enabled.iter().any(|id| id == a.id()))
        .collect(),
    }
  }

  pub fn ids(&self) -> Vec<&str> {
    self.adapters.iter().map(|a| a.id()).collect()
  }

  pub fn len(&self) -> usize {
    self.adapters.len()
  }

  pub fn is_empty(&self) -> bool {
    self.adapters.is_empty()
  }
}
