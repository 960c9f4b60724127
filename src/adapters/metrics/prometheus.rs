//! Prometheus Metrics Registry - Oracle Observability
//!
//! Counts quotes per exchange, cache hits and per-protocol pair
//! outcomes, and times the whole `fetch_prices` call. The registry is
//! private so tests and binaries can each own an isolated instance.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the oracle.
///
/// All metrics follow the naming convention `price_oracle_*`.
pub struct OracleMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Quotes accepted from a live exchange call.
    pub quotes_fetched: IntCounterVec,
    /// Quotes dropped (transport, shape, stale, invalid).
    pub quotes_rejected: IntCounterVec,
    /// Quotes served from the cache instead of the exchange.
    pub cache_hits: IntCounter,
    /// Pairs that reached a signature.
    pub pairs_signed: IntCounterVec,
    /// Pairs reported as `PriceError`.
    pub pairs_failed: IntCounterVec,
    /// End-to-end latency of one `fetch_prices` call (ms).
    pub request_latency_ms: Histogram,
}

impl OracleMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let quotes_fetched = IntCounterVec::new(
            Opts::new("price_oracle_quotes_fetched_total", "Quotes accepted from exchanges"),
            &["exchange"],
        )?;

        let quotes_rejected = IntCounterVec::new(
            Opts::new("price_oracle_quotes_rejected_total", "Quotes dropped before aggregation"),
            &["exchange", "reason"],
        )?;

        let cache_hits = IntCounter::new("price_oracle_cache_hits_total", "Quotes served from cache")?;

        let pairs_signed = IntCounterVec::new(
            Opts::new("price_oracle_pairs_signed_total", "Pairs signed"),
            &["protocol"],
        )?;

        let pairs_failed = IntCounterVec::new(
            Opts::new("price_oracle_pairs_failed_total", "Pairs reported as errors"),
            &["protocol", "reason"],
        )?;

        let request_latency_ms = Histogram::with_opts(
            HistogramOpts::new(
                "price_oracle_request_latency_ms",
                "fetch_prices latency in milliseconds",
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(quotes_fetched.clone()))?;
        registry.register(Box::new(quotes_rejected.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(pairs_signed.clone()))?;
        registry.register(Box::new(pairs_failed.clone()))?;
        registry.register(Box::new(request_latency_ms.clone()))?;

        Ok(Self {
            registry,
            quotes_fetched,
            quotes_rejected,
            cache_hits,
            pairs_signed,
            pairs_failed,
            request_latency_ms,
        })
    }

    /// Render every metric in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
