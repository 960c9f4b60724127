//! Quote Cache - Short-lived Per-exchange Price Memory
//!
//! Remembers the last good quote per `(from, to, exchange)` so that
//! bursts of requests for the same pair do not hammer the exchanges.
//! Entries expire after `cache_duration`; expired entries are purged
//! lazily by the reads that meet them, there is no sweeper task.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::domain::types::Source;
use crate::ports::clock::Clock;

/// Default lifetime of a cache entry (ms).
pub const DEFAULT_CACHE_DURATION_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
  from: String,
  to: String,
  exchange_id: String,
}

impl CacheKey {
  fn new(from: &str, to: &str, exchange_id: &str) -> Self {
    Self {
      from: from.to_string(),
      to: to.to_string(),
      exchange_id: exchange_id.to_string(),
    }
  }
}

/// Last quote seen from one exchange for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub price: f64,
  /// Time the entry was written (Unix ms).
  pub timestamp: u64,
  pub sources: Vec<Source>,
}

impl CacheEntry {
  /// Exchange that produced the entry.
  pub fn exchange_id(&self) -> Option<&str> {
    self.sources.first().map(|s| s.exchange_id.as_str())
  }
}

/// TTL map of recent quotes, safe to share between tasks.
pub struct QuoteCache {
  entries: DashMap<CacheKey, CacheEntry>,
  duration_ms: u64,
  clock: Arc<dyn Clock>,
}

impl QuoteCache {
  pub fn new(duration_ms: u64, clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: DashMap::new(),
      duration_ms,
      clock,
    }
  }

  pub fn duration_ms(&self) -> u64 {
    self.duration_ms
  }

  /// Store a quote, replacing any previous entry for the same key.
  pub fn set(&self, from: &str, to: &str, exchange_id: &str, price: f64, certificate: &str) {
    let entry = CacheEntry {
      price,
      timestamp: self.clock.now_ms(),
      sources: vec![Source {
        exchange_id: exchange_id.to_string(),
        certificate: certificate.to_string(),
      }],
    };
    trace!(from, to, exchange_id, price, "Quote cached");
    self.entries.insert(CacheKey::new(from, to, exchange_id), entry);
  }

  /// Live entry for one exchange, if any.
  pub fn get(&self, from: &str, to: &str, exchange_id: &str) -> Option<CacheEntry> {
    let key = CacheKey::new(from, to, exchange_id);
    let now = self.clock.now_ms();

    // Clone out so the shard guard is released before any removal.
    let entry = self.entries.get(&key).map(|e| e.value().clone())?;
    if self.is_live(&entry, now) {
      return Some(entry);
    }

    self.evict(&key, now);
    None
  }

  /// Live entries for a pair, restricted to `exchanges` when given.
  ///
  /// Results are ordered by exchange id.
  pub fn get_all(&self, from: &str, to: &str, exchanges: Option<&[String]>) -> Vec<CacheEntry> {
    let now = self.clock.now_ms();
    let mut live = Vec::new();
    let mut expired = Vec::new();

    for item in self.entries.iter() {
      let key = item.key();
      if key.from != from || key.to != to {
        continue;
      }
      if let Some(allowed) = exchanges {
        if !allowed.iter().any(|id| *id == key.exchange_id) {
          continue;
        }
      }
      if self.is_live(item.value(), now) {
        live.push((key.exchange_id.clone(), item.value().clone()));
      } else {
        expired.push(key.clone());
      }
    }

    for key in &expired {
      self.evict(key, now);
    }

    live.sort_by(|a, b| a.0.cmp(&b.0));
    live.into_iter().map(|(_, entry)| entry).collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn is_live(&self, entry: &CacheEntry, now: u64) -> bool {
    now.saturating_sub(entry.timestamp) < self.duration_ms
  }

  /// Remove `key` unless a concurrent `set` has refreshed it.
  fn evict(&self, key: &CacheKey, now: u64) {
    let removed = self
      .entries
      .remove_if(key, |_, entry| !self.is_live(entry, now))
      .is_some();
    if removed {
      trace!(exchange_id = %key.exchange_id, "Expired quote evicted");
    }
  }
}
