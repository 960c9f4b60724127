//! Price statistics and fixed-point conversion.
//!
//! Plain `f64` helpers with no I/O. Callers guarantee non-empty input
//! for the order statistics; the aggregator checks source counts first.

use super::error::{OracleError, OracleResult};
use super::types::AggregationType;

/// Median of the values; even lengths average the two middle values.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Population standard deviation.
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Collapse the values with the given statistic.
pub fn aggregate(values: &[f64], aggregation: AggregationType) -> f64 {
    match aggregation {
        AggregationType::Median => median(values),
        AggregationType::Mean => mean(values),
        AggregationType::Min => min(values),
        AggregationType::Max => max(values),
    }
}

/// Most decimals a fixed-point price can carry; `10^38 < 2^128 < 10^39`.
pub const MAX_DECIMALS: u32 = 38;

/// `round(value * 10^decimals)`, rounding half away from zero.
pub fn normalize(value: f64, decimals: u32) -> f64 {
    let scale = i32::try_from(decimals).map_or(f64::INFINITY, |d| 10f64.powi(d));
    (value * scale).round()
}

/// Fixed-point integer for on-chain encoding.
///
/// # Errors
/// `Encoding` when `decimals` exceeds `MAX_DECIMALS`, or the scaled
/// value is negative, not finite or does not fit in 128 bits.
pub fn to_fixed_point(value: f64, decimals: u32) -> OracleResult<u128> {
    if decimals > MAX_DECIMALS {
        return Err(OracleError::Encoding(format!(
            "{decimals} decimals exceeds the maximum of {MAX_DECIMALS}"
        )));
    }
    let scaled = normalize(value, decimals);
    if !scaled.is_finite() || scaled < 0.0 || scaled >= 2f64.powi(128) {
        return Err(OracleError::Encoding(format!(
            "price {value} with {decimals} decimals is not representable as u128"
        )));
    }
    Ok(scaled as u128)
}

/// Deviation of `b` from reference `a`, in percent of `a`.
pub fn relative_price_difference(a: f64, b: f64) -> f64 {
    ((a - b) / a).abs() * 100.0
}
