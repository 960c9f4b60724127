//! Price Pipeline - `fetch_prices` Orchestration
//!
//! The main use case. For a batch of pairs:
//! 1. Hashes the whole request once
//! 2. Collects quotes per pair (QuoteFetcher)
//! 3. Aggregates and applies the source policy (Aggregator)
//! 4. Reconciles client reference values (ClientPriceReconciler)
//! 5. Encodes and signs for the target protocol (PriceSigner)
//!
//! Pairs run concurrently and fail independently. Only a batch in
//! which every pair failed is an error.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::B256;
use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::OracleMetrics;
use crate::config::OracleConfig;
use crate::domain::aggregator::{AggregationPolicy, Aggregator};
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::math::MAX_DECIMALS;
use crate::domain::reconciler::{ClientPriceReconciler, ReconcilePolicy};
use crate::domain::request_hash::hash_request;
use crate::domain::types::{
  AggregationType, FetchParams, FetchPricesResult, PairRequest, PriceError, PriceInfo, Protocol,
  SignedPrice, Source, RESULT_VERSION,
};
use crate::ports::clock::Clock;

use super::price_signer::PriceSigner;
use super::quote_fetcher::QuoteFetcher;

/// Where a pair is in its journey through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
  Requested,
  Fetching,
  Aggregating,
  Validating,
  Encoding,
  Signing,
  Signed,
  Failed,
}

impl fmt::Display for PairState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Requested => "requested",
      Self::Fetching => "fetching",
      Self::Aggregating => "aggregating",
      Self::Validating => "validating",
      Self::Encoding => "encoding",
      Self::Signing => "signing",
      Self::Signed => "signed",
      Self::Failed => "failed",
    };
    f.write_str(s)
  }
}

/// Batch settings after request values and configured defaults merge.
#[derive(Debug, Clone)]
struct ResolvedParams {
  protocol: Protocol,
  types: Vec<AggregationType>,
  allow_list: Option<Vec<String>>,
  trade_age_limit_ms: u64,
  aggregator: Aggregator,
  reconciler: ClientPriceReconciler,
  request_hash: B256,
}

/// Orchestrates fetch, aggregation, reconciliation and signing.
pub struct PricePipeline {
  fetcher: QuoteFetcher,
  signer: PriceSigner,
  clock: Arc<dyn Clock>,
  defaults: OracleConfig,
  metrics: Arc<OracleMetrics>,
}

impl PricePipeline {
  pub fn new(
    fetcher: QuoteFetcher,
    signer: PriceSigner,
    clock: Arc<dyn Clock>,
    defaults: OracleConfig,
    metrics: Arc<OracleMetrics>,
  ) -> Self {
    Self {
      fetcher,
      signer,
      clock,
      defaults,
      metrics,
    }
  }

  /// Produce signed prices for every pair of the request.
  ///
  /// Pairs that fail end up in `price_errors`; the others appear in
  /// both `price_infos` and `signed_prices`, in request order.
  ///
  /// # Errors
  /// `AllPairsFailed` when no pair could be signed, carrying every
  /// pair's message.
  #[instrument(skip(self, params), fields(protocol = %params.protocol, pairs = params.pairs.len()))]
  pub async fn fetch_prices(&self, params: &FetchParams) -> OracleResult<FetchPricesResult> {
    let started = Instant::now();
    let result = self.run(params).await;
    self
      .metrics
      .request_latency_ms
      .observe(started.elapsed().as_secs_f64() * 1_000.0);
    result
  }

  async fn run(&self, params: &FetchParams) -> OracleResult<FetchPricesResult> {
    if params.pairs.is_empty() {
      return Err(OracleError::AllPairsFailed("no pairs requested".to_string()));
    }

    let resolved = match self.resolve(params) {
      Ok(resolved) => resolved,
      Err(e) => {
        let message = params
          .pairs
          .iter()
          .map(|p| format!("{}: {e}", p.label()))
          .collect::<Vec<_>>()
          .join("; ");
        warn!(error = %e, "Request rejected for every pair");
        for _ in &params.pairs {
          self
            .metrics
            .pairs_failed
            .with_label_values(&[params.protocol.as_str(), e.kind()])
            .inc();
        }
        return Err(OracleError::AllPairsFailed(message));
      }
    };

    let outcomes = join_all(params.pairs.iter().map(|pair| self.process_pair(pair, &resolved))).await;

    let mut result = FetchPricesResult {
      price_infos: Vec::new(),
      price_errors: Vec::new(),
      signed_prices: Vec::new(),
      version: RESULT_VERSION.to_string(),
    };

    for (pair, outcome) in params.pairs.iter().zip(outcomes) {
      match outcome {
        Ok((info, signed)) => {
          self
            .metrics
            .pairs_signed
            .with_label_values(&[resolved.protocol.as_str()])
            .inc();
          result.price_infos.push(info);
          result.signed_prices.push(signed);
        }
        Err(e) => {
          self
            .metrics
            .pairs_failed
            .with_label_values(&[resolved.protocol.as_str(), e.kind()])
            .inc();
          result.price_errors.push(PriceError {
            from: pair.from.clone(),
            to: pair.to.clone(),
            message: e.to_string(),
          });
        }
      }
    }

    if result.signed_prices.is_empty() {
      let message = result
        .price_errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
      return Err(OracleError::AllPairsFailed(message));
    }

    info!(
      signed = result.signed_prices.len(),
      failed = result.price_errors.len(),
      "Prices fetched"
    );

    Ok(result)
  }

  /// Merge request values with configured defaults and hash the request.
  fn resolve(&self, params: &FetchParams) -> OracleResult<ResolvedParams> {
    let protocol: Protocol = params.protocol.parse()?;
    let request_hash = hash_request(params)?;

    // Zero means "not set" for these three, like an absent field.
    let aggregator = Aggregator::new(AggregationPolicy {
      min_sources: params
        .min_sources
        .filter(|n| *n > 0)
        .unwrap_or(self.defaults.min_sources),
      max_sources_deviation: params.max_sources_deviation,
    });
    let reconciler = ClientPriceReconciler::new(ReconcilePolicy {
      max_validation_diff: params
        .max_validation_diff
        .filter(|d| *d > 0.0)
        .unwrap_or(self.defaults.max_validation_diff),
      timestamp_tolerance_ms: self.defaults.client_timestamp_tolerance_ms,
    });

    debug!(%protocol, request_hash = %request_hash, "Request resolved");

    Ok(ResolvedParams {
      protocol,
      types: params.aggregation_types(self.defaults.default_aggregation),
      allow_list: params.exchanges.clone(),
      trade_age_limit_ms: params
        .trade_age_limit
        .filter(|ms| *ms > 0)
        .unwrap_or(self.defaults.trade_age_limit_ms),
      aggregator,
      reconciler,
      request_hash,
    })
  }

  /// Run one pair through every stage, tracing each transition.
  async fn process_pair(
    &self,
    pair: &PairRequest,
    resolved: &ResolvedParams,
  ) -> OracleResult<(PriceInfo, SignedPrice)> {
    let label = pair.label();
    let outcome = self.advance(pair, &label, resolved).await;
    match &outcome {
      Ok(_) => debug!(pair = %label, state = %PairState::Signed, "Pair state"),
      Err(e) => warn!(pair = %label, state = %PairState::Failed, error = %e, "Pair state"),
    }
    outcome
  }

  async fn advance(
    &self,
    pair: &PairRequest,
    label: &str,
    resolved: &ResolvedParams,
  ) -> OracleResult<(PriceInfo, SignedPrice)> {
    let trace = |state: PairState| debug!(pair = %label, %state, "Pair state");

    trace(PairState::Requested);
    let decimals = pair.decimals.unwrap_or(self.defaults.default_decimals);
    if decimals > MAX_DECIMALS {
      return Err(OracleError::Encoding(format!(
        "{label}: {decimals} decimals exceeds the maximum of {MAX_DECIMALS}"
      )));
    }

    trace(PairState::Fetching);
    let quotes = self
      .fetcher
      .fetch(
        &pair.from,
        &pair.to,
        resolved.allow_list.as_deref(),
        resolved.trade_age_limit_ms,
      )
      .await;

    trace(PairState::Aggregating);
    let raw_prices: Vec<f64> = quotes.iter().map(|q| q.price).collect();
    let aggregate = resolved
      .aggregator
      .aggregate(label, &raw_prices, &resolved.types)?;

    trace(PairState::Validating);
    let reconciled = resolved.reconciler.reconcile(
      pair,
      &aggregate,
      &resolved.types,
      decimals,
      self.clock.now_ms(),
    )?;

    let info = PriceInfo {
      from: pair.from.clone(),
      to: pair.to.clone(),
      decimals,
      price: reconciled.price,
      validation: reconciled.validation,
      timestamp: reconciled.timestamp,
      raw_prices,
      std_dev: aggregate.std_dev,
      sources: quotes
        .into_iter()
        .map(|q| Source {
          exchange_id: q.exchange_id,
          certificate: q.certificate,
        })
        .collect(),
    };

    trace(PairState::Encoding);
    let encoded = self
      .signer
      .encode(&info, resolved.protocol, resolved.request_hash)?;

    trace(PairState::Signing);
    let signed = self.signer.sign(encoded).await?;

    Ok((info, signed))
  }
}
