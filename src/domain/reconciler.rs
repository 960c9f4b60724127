//! Client Price Reconciler
//!
//! A client may send its own reference price (one per aggregation type)
//! and timestamp. Where the reference lies within `max_validation_diff`
//! percent of the oracle's value, the client's value is emitted so that
//! the signed payload matches what the client expects on-chain.

use std::collections::BTreeMap;

use tracing::debug;

use super::aggregator::Aggregate;
use super::error::{OracleError, OracleResult};
use super::math;
use super::types::{AggregationType, PairRequest};

/// Default maximum client/oracle deviation (percent).
pub const DEFAULT_MAX_VALIDATION_DIFF: f64 = 0.05;

/// Default window for accepting a client timestamp (ms).
pub const CLIENT_TIMESTAMP_TOLERANCE_MS: u64 = 60_000;

/// Tolerances for client-supplied values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    /// Maximum deviation in percent of the oracle value.
    pub max_validation_diff: f64,
    /// Maximum distance between client timestamp and oracle clock.
    pub timestamp_tolerance_ms: u64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_validation_diff: DEFAULT_MAX_VALIDATION_DIFF,
            timestamp_tolerance_ms: CLIENT_TIMESTAMP_TOLERANCE_MS,
        }
    }
}

/// Final per-pair values ready to go into a `PriceInfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub price: BTreeMap<AggregationType, u128>,
    pub validation: Option<BTreeMap<AggregationType, bool>>,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct ClientPriceReconciler {
    policy: ReconcilePolicy,
}

impl ClientPriceReconciler {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    /// Convert the aggregate to fixed point, substituting client values
    /// that fall within tolerance.
    ///
    /// `types` is the request's aggregation order; client prices are
    /// matched to it positionally. The timestamp rule is evaluated once.
    ///
    /// # Errors
    /// `ParamMismatch` when the number of client prices differs from
    /// the number of aggregation types; `Encoding` when a value cannot
    /// be represented in fixed point.
    pub fn reconcile(
        &self,
        pair: &PairRequest,
        aggregate: &Aggregate,
        types: &[AggregationType],
        decimals: u32,
        now_ms: u64,
    ) -> OracleResult<Reconciled> {
        let mut price = BTreeMap::new();
        let mut validation = None;

        match pair.price.as_ref().map(|p| p.as_slice()) {
            Some(client_prices) => {
                if client_prices.len() != types.len() {
                    return Err(OracleError::ParamMismatch {
                        expected: types.len(),
                        got: client_prices.len(),
                    });
                }

                let mut checks = BTreeMap::new();
                for (&t, &client) in types.iter().zip(client_prices) {
                    let calculated = aggregate.values.get(&t).copied().ok_or_else(|| {
                        OracleError::Encoding(format!("missing {t} aggregate for {}", pair.label()))
                    })?;
                    let deviation = math::relative_price_difference(calculated, client);
                    let accepted = deviation <= self.policy.max_validation_diff;

                    debug!(
                        pair = %pair.label(),
                        aggregation = %t,
                        deviation,
                        accepted,
                        "Client price checked"
                    );

                    let emitted = if accepted { client } else { calculated };
                    price.insert(t, math::to_fixed_point(emitted, decimals)?);
                    checks.insert(t, accepted);
                }
                validation = Some(checks);
            }
            None => {
                for &t in types {
                    if let Some(&value) = aggregate.values.get(&t) {
                        price.insert(t, math::to_fixed_point(value, decimals)?);
                    }
                }
            }
        }

        let timestamp = match pair.timestamp {
            Some(client_ts) if client_ts.abs_diff(now_ms) <= self.policy.timestamp_tolerance_ms => {
                client_ts
            }
            _ => now_ms,
        };

        Ok(Reconciled {
            price,
            validation,
            timestamp,
        })
    }
}
