//! Metrics Adapters
//!
//! Prometheus counters for quote collection and the signing pipeline,
//! rendered in the text exposition format.

pub mod prometheus;

pub use prometheus::OracleMetrics;
