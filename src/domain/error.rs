//! Oracle Error Taxonomy
//!
//! Every failure the price pipeline can produce. Per-exchange errors
//! (`StaleTrade`, `InvalidQuote`, `Source`, `AdapterNotFound`) are
//! absorbed by the fetcher and only reduce the usable source count.
//! Per-pair errors become a `PriceError` in the response. Only
//! `AllPairsFailed` fails a whole request.

use thiserror::Error;

/// Errors raised by the aggregation engine and signing pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// Fewer usable quotes than the request's `minSources`.
    #[error("Not enough sources for {pair}, {found} / {required} sources fetched")]
    InsufficientSources {
        /// Pair label, e.g. `BTC-USD`.
        pair: String,
        /// Usable quotes collected.
        found: usize,
        /// Required minimum.
        required: usize,
    },

    /// Population standard deviation of the quotes exceeds `maxSourcesDeviation`.
    #[error("Standard deviation ({std_dev}) exceeds maximum allowed ({max}) for {pair}")]
    ExcessiveDeviation {
        /// Pair label.
        pair: String,
        /// Measured standard deviation.
        std_dev: f64,
        /// Configured maximum.
        max: f64,
    },

    /// Last trade reported by an exchange is older than `tradeAgeLimit`.
    #[error("Trade age exceeds limit for {exchange}: {age_ms}ms > {limit_ms}ms")]
    StaleTrade {
        /// Exchange id.
        exchange: String,
        /// Observed trade age.
        age_ms: u64,
        /// Allowed age.
        limit_ms: u64,
    },

    /// Exchange returned a price that is not a finite positive number.
    #[error("Invalid price data from {exchange}: {price}")]
    InvalidQuote {
        /// Exchange id.
        exchange: String,
        /// Offending value.
        price: f64,
    },

    /// Transport or response-shape failure for one exchange.
    #[error("{exchange}: {reason}")]
    Source {
        /// Exchange id.
        exchange: String,
        /// Failure description.
        reason: String,
    },

    /// Client supplied a different number of prices than aggregation types.
    #[error("Client supplied {got} prices for {expected} aggregation types")]
    ParamMismatch {
        /// Number of aggregation types requested.
        expected: usize,
        /// Number of client prices supplied.
        got: usize,
    },

    /// Protocol tag not recognised.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// PriceData could not be laid out for the target protocol.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Packed bytes do not match the expected layout.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Signer rejected the payload or lacks a key for the curve.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Exchange id is not present in the registry.
    #[error("Exchange {0} not found in configurations")]
    AdapterNotFound(String),

    /// Every pair of the batch failed.
    #[error("All pairs failed: {0}")]
    AllPairsFailed(String),
}

impl OracleError {
    /// Stable snake_case label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientSources { .. } => "insufficient_sources",
            Self::ExcessiveDeviation { .. } => "excessive_deviation",
            Self::StaleTrade { .. } => "stale_trade",
            Self::InvalidQuote { .. } => "invalid_quote",
            Self::Source { .. } => "source",
            Self::ParamMismatch { .. } => "param_mismatch",
            Self::UnsupportedProtocol(_) => "unsupported_protocol",
            Self::Encoding(_) => "encoding",
            Self::Decoding(_) => "decoding",
            Self::Signing(_) => "signing",
            Self::AdapterNotFound(_) => "adapter_not_found",
            Self::AllPairsFailed(_) => "all_pairs_failed",
        }
    }
}

/// Convenience alias used throughout the domain and use-case layers.
pub type OracleResult<T> = Result<T, OracleError>;
