//! Domain layer - Price consensus logic and models.
//!
//! Pure, synchronous logic: statistics, source policy, client price
//! reconciliation and request hashing. No I/O happens here
//! (hexagonal architecture inner ring).

pub mod aggregator;
pub mod error;
pub mod math;
pub mod reconciler;
pub mod request_hash;
pub mod types;

// Re-export core types for convenience
pub use aggregator::{Aggregate, AggregationPolicy, Aggregator};
pub use error::{OracleError, OracleResult};
pub use reconciler::{ClientPriceReconciler, ReconcilePolicy, Reconciled};
pub use types::{
    AggregationType, Curve, FetchParams, FetchPricesResult, OneOrMany, PairRequest, PriceData,
    PriceError, PriceInfo, Protocol, Quote, SignedPrice, Source,
};
