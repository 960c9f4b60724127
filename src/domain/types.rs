//! Oracle Domain Types
//!
//! Request parameters, per-pair results and the canonical `PriceData`
//! record that is encoded and signed. Field names on the wire are
//! camelCase to match the JSON request/response contract.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use super::error::{OracleError, OracleResult};

/// Response version reported to callers.
pub const RESULT_VERSION: &str = "1.0.0";

/// Statistic used to collapse raw quotes into one price.
///
/// Declaration order is the canonical order of `PriceData.price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Median,
    Mean,
    Min,
    Max,
}

impl AggregationType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON value that may be given either as a scalar or as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// View as a slice regardless of shape.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(v) => v,
        }
    }
}

/// Target chain family of the signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Substrate,
    Wasm,
    Ink,
    Gear,
    Evm,
    Tezos,
    Youves,
}

impl Protocol {
    /// Wire tag as sent by clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substrate => "Substrate",
            Self::Wasm => "WASM",
            Self::Ink => "Ink!",
            Self::Gear => "Gear",
            Self::Evm => "EVM",
            Self::Tezos => "Tezos",
            Self::Youves => "Youves",
        }
    }
}

impl FromStr for Protocol {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Substrate" => Ok(Self::Substrate),
            "WASM" => Ok(Self::Wasm),
            "Ink!" => Ok(Self::Ink),
            "Gear" => Ok(Self::Gear),
            "EVM" => Ok(Self::Evm),
            "Tezos" => Ok(Self::Tezos),
            "Youves" => Ok(Self::Youves),
            other => Err(OracleError::UnsupportedProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elliptic curve a signing key lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Secp256k1,
    P256,
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => f.write_str("secp256k1"),
            Self::P256 => f.write_str("p256"),
        }
    }
}

/// A single price observation from one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Last trade price in quote-currency units.
    pub price: f64,
    /// Trade or cache time (Unix ms).
    pub timestamp: u64,
    /// Registry id of the exchange (e.g. `BNC`).
    pub exchange_id: String,
    /// Transport provenance proof, hex encoded. Opaque to the core.
    pub certificate: String,
}

/// Provenance of one quote as reported in `PriceInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub exchange_id: String,
    pub certificate: String,
}

/// One pair of a `fetchPrices` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    /// Base asset symbol.
    pub from: String,
    /// Quote asset symbol.
    pub to: String,
    /// Fixed-point decimals override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    /// Client reference price(s), one per aggregation type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<OneOrMany<f64>>,
    /// Client reference timestamp (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl PairRequest {
    /// Plain pair with no overrides.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            decimals: None,
            price: None,
            timestamp: None,
        }
    }

    /// `FROM-TO` label used in logs and error messages.
    pub fn label(&self) -> String {
        pair_label(&self.from, &self.to)
    }
}

/// Batch-level parameters of a `fetchPrices` request.
///
/// Optional fields stay optional so the request hash covers exactly
/// what the client sent; defaults are applied by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchParams {
    pub pairs: Vec<PairRequest>,
    /// Protocol wire tag; parsed by the pipeline so an unknown tag
    /// surfaces as `UnsupportedProtocol` rather than a parse failure.
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanges: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sources: Option<usize>,
    /// Maximum trade age in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_age_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<OneOrMany<AggregationType>>,
    /// Maximum population standard deviation across sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources_deviation: Option<f64>,
    /// Maximum client/oracle deviation in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_validation_diff: Option<f64>,
}

impl FetchParams {
    /// Minimal request for the given pairs and protocol.
    pub fn new(pairs: Vec<PairRequest>, protocol: Protocol) -> Self {
        Self {
            pairs,
            protocol: protocol.as_str().to_string(),
            exchanges: None,
            min_sources: None,
            trade_age_limit: None,
            aggregation: None,
            max_sources_deviation: None,
            max_validation_diff: None,
        }
    }

    /// Requested aggregation types, de-duplicated in request order.
    ///
    /// Falls back to `default` when the request names none.
    pub fn aggregation_types(&self, default: AggregationType) -> Vec<AggregationType> {
        let requested = self.aggregation.as_ref().map_or(&[][..], OneOrMany::as_slice);
        let mut out: Vec<AggregationType> = Vec::with_capacity(requested.len().max(1));
        for t in requested {
            if !out.contains(t) {
                out.push(*t);
            }
        }
        if out.is_empty() {
            out.push(default);
        }
        out
    }
}

/// Aggregated, validated result for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    pub from: String,
    pub to: String,
    pub decimals: u32,
    /// Fixed-point price per aggregation type.
    pub price: BTreeMap<AggregationType, u128>,
    /// Whether the client's value was accepted, per aggregation type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<BTreeMap<AggregationType, bool>>,
    /// Unix ms.
    pub timestamp: u64,
    pub raw_prices: Vec<f64>,
    pub std_dev: f64,
    pub sources: Vec<Source>,
}

/// Source entry of `PriceData`, certificate reduced to 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDataSource {
    pub exchange_id: String,
    pub certificate: B256,
}

/// Canonical, protocol-agnostic record that gets encoded and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
    pub from: String,
    pub to: String,
    pub decimals: u32,
    /// Prices in canonical aggregation order (median, mean, min, max).
    pub price: Vec<u128>,
    pub timestamp: u64,
    pub sources: Vec<PriceDataSource>,
    pub request_hash: B256,
}

impl PriceData {
    /// Derive the signable record from a `PriceInfo` and the batch hash.
    ///
    /// # Errors
    /// `Encoding` if a certificate is not 32 bytes of hex.
    pub fn from_info(info: &PriceInfo, request_hash: B256) -> OracleResult<Self> {
        let sources = info
            .sources
            .iter()
            .map(|s| {
                parse_bytes32(&s.certificate)
                    .map(|certificate| PriceDataSource {
                        exchange_id: s.exchange_id.clone(),
                        certificate,
                    })
                    .map_err(|e| {
                        OracleError::Encoding(format!("certificate of {}: {e}", s.exchange_id))
                    })
            })
            .collect::<OracleResult<Vec<_>>>()?;

        Ok(Self {
            from: info.from.clone(),
            to: info.to.clone(),
            decimals: info.decimals,
            price: info.price.values().copied().collect(),
            timestamp: info.timestamp,
            sources,
            request_hash,
        })
    }

    /// Certificates in source order.
    pub fn certificates(&self) -> Vec<B256> {
        self.sources.iter().map(|s| s.certificate).collect()
    }
}

/// Parse a 32-byte hex string, with or without `0x` prefix.
pub fn parse_bytes32(hex_str: &str) -> Result<B256, String> {
    let raw = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = alloy::hex::decode(raw).map_err(|e| format!("invalid hex: {e}"))?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    Ok(B256::from_slice(&bytes))
}

/// Signed output for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPrice {
    pub price_data: PriceData,
    /// Hex of the encoded payload.
    pub packed: String,
    /// Hex of the signature.
    pub signature: String,
    /// Hex public key matching the signature's curve.
    pub pub_key: String,
}

/// Failure report for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceError {
    pub from: String,
    pub to: String,
    pub message: String,
}

/// Response of `fetch_prices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchPricesResult {
    pub price_infos: Vec<PriceInfo>,
    pub price_errors: Vec<PriceError>,
    pub signed_prices: Vec<SignedPrice>,
    pub version: String,
}

/// `FROM-TO` label.
pub fn pair_label(from: &str, to: &str) -> String {
    format!("{from}-{to}")
}
