//! Quote Aggregator - Source Policy and Statistics
//!
//! Turns the raw prices collected for a pair into one value per
//! requested aggregation type, after enforcing the source-count and
//! dispersion policies. Both policy failures are fatal for the pair
//! only, never for the batch.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::{OracleError, OracleResult};
use super::math;
use super::types::AggregationType;

/// Source-count and dispersion limits for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationPolicy {
    /// Minimum number of usable quotes.
    pub min_sources: usize,
    /// Maximum population standard deviation, if enforced.
    pub max_sources_deviation: Option<f64>,
}

/// Aggregated values for one pair, still in human units.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub values: BTreeMap<AggregationType, f64>,
    pub std_dev: f64,
}

/// Applies an `AggregationPolicy` to raw prices.
#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    /// Validate the prices and compute every requested statistic.
    ///
    /// Checks run in order: no prices, too few prices, excessive
    /// standard deviation.
    ///
    /// # Errors
    /// `InsufficientSources` or `ExcessiveDeviation`.
    pub fn aggregate(
        &self,
        pair: &str,
        prices: &[f64],
        types: &[AggregationType],
    ) -> OracleResult<Aggregate> {
        if prices.is_empty() || prices.len() < self.policy.min_sources {
            return Err(OracleError::InsufficientSources {
                pair: pair.to_string(),
                found: prices.len(),
                required: self.policy.min_sources,
            });
        }

        let std_dev = math::standard_deviation(prices);
        if let Some(max) = self.policy.max_sources_deviation {
            if std_dev > max {
                return Err(OracleError::ExcessiveDeviation {
                    pair: pair.to_string(),
                    std_dev,
                    max,
                });
            }
        }

        let values = types
            .iter()
            .map(|&t| (t, math::aggregate(prices, t)))
            .collect::<BTreeMap<_, _>>();

        debug!(pair, sources = prices.len(), std_dev, "Prices aggregated");

        Ok(Aggregate { values, std_dev })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator(min_sources: usize, max_dev: Option<f64>) -> Aggregator {
        Aggregator::new(AggregationPolicy {
            min_sources,
            max_sources_deviation: max_dev,
        })
    }

    #[test]
    fn test_two_sources_median() {
        let agg = aggregator(2, None)
            .aggregate("BTC-USD", &[50000.0, 51000.0], &[AggregationType::Median])
            .unwrap();
        assert_eq!(agg.values[&AggregationType::Median], 50500.0);
        assert_eq!(agg.std_dev, 500.0);
    }

    #[test]
    fn test_rejects_single_source_when_two_required() {
        let err = aggregator(2, None)
            .aggregate("BTC-USD", &[50000.0], &[AggregationType::Median])
            .unwrap_err();
        assert_eq!(
            err,
            OracleError::InsufficientSources {
                pair: "BTC-USD".into(),
                found: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_rejects_empty_even_with_zero_minimum() {
        let err = aggregator(0, None)
            .aggregate("BTC-USD", &[], &[AggregationType::Median])
            .unwrap_err();
        assert!(matches!(err, OracleError::InsufficientSources { found: 0, .. }));
    }

    #[test]
    fn test_excessive_deviation() {
        let err = aggregator(2, Some(100.0))
            .aggregate("BTC-USD", &[50000.0, 51000.0], &[AggregationType::Median])
            .unwrap_err();
        assert!(matches!(err, OracleError::ExcessiveDeviation { .. }));
    }

    #[test]
    fn test_multiple_types() {
        let agg = aggregator(3, Some(50.0))
            .aggregate(
                "ETH-USD",
                &[100.0, 110.0, 120.0],
                &[AggregationType::Max, AggregationType::Min, AggregationType::Mean],
            )
            .unwrap();
        assert_eq!(agg.values.len(), 3);
        assert_eq!(agg.values[&AggregationType::Min], 100.0);
        assert_eq!(agg.values[&AggregationType::Max], 120.0);
        assert_eq!(agg.values[&AggregationType::Mean], 110.0);
    }
}
