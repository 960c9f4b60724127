//! Clock Port - Injectable Wall Clock
//!
//! Cache expiry, trade-age checks and timestamp reconciliation all read
//! time through this trait so tests can drive time by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of the current Unix time in milliseconds.
pub trait Clock: Send + Sync + 'static {
  fn now_ms(&self) -> u64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
  }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
  now: Arc<AtomicU64>,
}

impl ManualClock {
  pub fn new(start_ms: u64) -> Self {
    Self {
      now: Arc::new(AtomicU64::new(start_ms)),
    }
  }

  pub fn set(&self, ms: u64) {
    self.now.store(ms, Ordering::SeqCst);
  }

  pub fn advance(&self, ms: u64) {
    self.now.fetch_add(ms, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now_ms(&self) -> u64 {
    self.now.load(Ordering::SeqCst)
  }
}
