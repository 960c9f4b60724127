//! Integration Tests - End-to-end Pipeline Testing
//!
//! Drives `PricePipeline::fetch_prices` through the real exchange
//! registry and codecs, with the HTTP client and signer mocked.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::hex;
use mockall::mock;
use serde_json::json;

use price_oracle::adapters::exchanges::default_registry;
use price_oracle::adapters::metrics::OracleMetrics;
use price_oracle::codec::{AbiCodec, ScaleCodec, SigningPayload, TezosCodec, YouvesCodec};
use price_oracle::config::OracleConfig;
use price_oracle::domain::request_hash::hash_request;
use price_oracle::domain::types::{
    AggregationType, Curve, FetchParams, OneOrMany, PairRequest, Protocol,
};
use price_oracle::domain::OracleError;
use price_oracle::ports::clock::{Clock, ManualClock};
use price_oracle::ports::http_client::{HttpClient, HttpResponse};
use price_oracle::ports::signer::Signer;
use price_oracle::usecases::{PricePipeline, PriceSigner, QuoteCache, QuoteFetcher};

const NOW: u64 = 1_726_039_366_272;

const BNC: &str = "api.binance.com";
const BNU: &str = "api.binance.us";
const MEXC: &str = "api.mexc.com";

// ---- Mock Definitions ----

mock! {
    pub Http {}

    #[async_trait::async_trait]
    impl HttpClient for Http {
        async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse>;
    }
}

mock! {
    pub KeySigner {}

    #[async_trait::async_trait]
    impl Signer for KeySigner {
        async fn sign(&self, payload: &SigningPayload, curve: Curve) -> anyhow::Result<Vec<u8>>;
        fn public_keys(&self) -> HashMap<Curve, String>;
    }
}

// ---- Helpers ----

fn certificate_for(host: &str) -> String {
    hex::encode(hmac_sha256::Hash::hash(host.as_bytes()))
}

/// HTTP mock answering Binance-shaped trades for the given hosts.
fn http_with(quotes: Vec<(&'static str, f64)>) -> MockHttp {
    let mut http = MockHttp::new();
    http.expect_get().returning(move |url, _headers| {
        for (host, price) in &quotes {
            if url.contains(host) {
                return Ok(HttpResponse {
                    body: json!([{ "price": price.to_string(), "time": NOW - 1_000 }]).to_string(),
                    certificate: certificate_for(host),
                });
            }
        }
        Err(anyhow::anyhow!("connection refused: {url}"))
    });
    http
}

/// Signer mock that returns the payload bytes as the "signature".
fn echo_signer(curve: Curve) -> MockKeySigner {
    let mut signer = MockKeySigner::new();
    signer
        .expect_public_keys()
        .returning(move || HashMap::from([(curve, format!("{curve}-pub"))]));
    signer
        .expect_sign()
        .returning(|payload, _curve| Ok(payload.as_bytes().to_vec()));
    signer
}

fn pipeline(http: MockHttp, signer: MockKeySigner) -> PricePipeline {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
    let metrics = Arc::new(OracleMetrics::new().unwrap());
    let cache = Arc::new(QuoteCache::new(60_000, Arc::clone(&clock)));
    let fetcher = QuoteFetcher::new(
        Arc::new(default_registry(&[])),
        Arc::new(http),
        cache,
        Arc::clone(&clock),
        Arc::clone(&metrics),
    );
    PricePipeline::new(
        fetcher,
        PriceSigner::new(Arc::new(signer)),
        clock,
        OracleConfig::default(),
        metrics,
    )
}

fn params(pairs: Vec<PairRequest>, protocol: Protocol, min_sources: usize) -> FetchParams {
    let mut params = FetchParams::new(pairs, protocol);
    params.exchanges = Some(vec!["BNC".into(), "BNU".into(), "MEXC".into()]);
    params.min_sources = Some(min_sources);
    params
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_two_sources_evm_end_to_end() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 2);

    let result = pipeline.fetch_prices(&params).await.unwrap();

    assert_eq!(result.version, "1.0.0");
    assert!(result.price_errors.is_empty());
    let info = &result.price_infos[0];
    assert_eq!(info.price[&AggregationType::Median], 5_050_000_000_000);
    assert_eq!(info.decimals, 8);
    assert_eq!(info.std_dev, 500.0);
    assert_eq!(info.raw_prices, vec![50_000.0, 51_000.0]);
    assert_eq!(info.timestamp, NOW);
    let ids: Vec<_> = info.sources.iter().map(|s| s.exchange_id.as_str()).collect();
    assert_eq!(ids, vec!["BNC", "BNU"]);

    let signed = &result.signed_prices[0];
    assert_eq!(signed.pub_key, "secp256k1-pub");
    assert_eq!(signed.price_data.request_hash, hash_request(&params).unwrap());

    let packed = hex::decode(&signed.packed).unwrap();
    let decoded = AbiCodec::decode(&packed).unwrap();
    assert_eq!(decoded.prices, vec![5_050_000_000_000]);
    assert_eq!(decoded.timestamp, NOW);
    assert_eq!(decoded.certificates.len(), 2);
    assert_eq!(hex::encode(decoded.certificates[0]), certificate_for(BNC));
    assert_eq!(signed.signature, hex::encode(alloy::primitives::keccak256(&packed)));
}

#[tokio::test]
async fn test_insufficient_sources_fails_batch() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 3);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    match err {
        OracleError::AllPairsFailed(message) => {
            assert!(message.contains("Not enough sources for BTC-USDT, 2 / 3 sources fetched"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_partial_batch_reports_errors() {
    let mut http = MockHttp::new();
    http.expect_get().returning(|url, _| {
        if url.contains("BTCUSDT") {
            Ok(HttpResponse {
                body: json!([{ "price": "50000", "time": NOW }]).to_string(),
                certificate: certificate_for(url),
            })
        } else {
            Err(anyhow::anyhow!("timeout"))
        }
    });
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let params = params(
        vec![PairRequest::new("BTC", "USDT"), PairRequest::new("DOGE", "USDT")],
        Protocol::Substrate,
        1,
    );

    let result = pipeline.fetch_prices(&params).await.unwrap();
    assert_eq!(result.signed_prices.len(), 1);
    assert_eq!(result.price_infos.len(), 1);
    assert_eq!(result.price_infos[0].from, "BTC");
    assert_eq!(result.price_errors.len(), 1);
    assert_eq!(result.price_errors[0].from, "DOGE");
    assert!(result.price_errors[0].message.contains("0 / 1"));
}

#[tokio::test]
async fn test_substrate_signs_sha256_of_scale_payload() {
    let http = http_with(vec![(BNC, 131.975), (BNU, 131.99), (MEXC, 131.98)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut pair = PairRequest::new("SOL", "USDT");
    pair.decimals = Some(9);
    let params = params(vec![pair], Protocol::Ink, 3);

    let result = pipeline.fetch_prices(&params).await.unwrap();
    let signed = &result.signed_prices[0];
    let packed = hex::decode(&signed.packed).unwrap();

    let decoded = ScaleCodec::decode(&packed).unwrap();
    assert_eq!(decoded.prices, vec![131_980_000_000]);
    assert_eq!(decoded.certificates.len(), 3);
    assert_eq!(signed.signature, hex::encode(hmac_sha256::Hash::hash(&packed)));
}

#[tokio::test]
async fn test_tezos_hands_raw_pack_to_p256() {
    let http = http_with(vec![(BNC, 3_000.0), (BNU, 3_002.0)]);
    let mut signer = MockKeySigner::new();
    signer
        .expect_public_keys()
        .returning(|| HashMap::from([(Curve::P256, "p2pk-test".to_string())]));
    signer
        .expect_sign()
        .withf(|payload, curve| {
            *curve == Curve::P256
                && matches!(payload, SigningPayload::Raw(bytes) if bytes.first() == Some(&0x05))
        })
        .times(1)
        .returning(|_, _| Ok(vec![0xaa; 64]));
    let pipeline = pipeline(http, signer);
    let params = params(vec![PairRequest::new("ETH", "USDT")], Protocol::Tezos, 2);

    let result = pipeline.fetch_prices(&params).await.unwrap();
    let signed = &result.signed_prices[0];
    assert_eq!(signed.pub_key, "p2pk-test");
    assert_eq!(signed.signature, "aa".repeat(64));

    let decoded = TezosCodec::decode(&hex::decode(&signed.packed).unwrap()).unwrap();
    assert_eq!(decoded.prices, vec![300_100_000_000]);
    assert_eq!(decoded.request_hash, hash_request(&params).unwrap());
}

#[tokio::test]
async fn test_youves_payload() {
    let http = http_with(vec![(BNC, 3_000.0), (BNU, 3_002.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::P256));
    let params = params(vec![PairRequest::new("ETH", "USDT")], Protocol::Youves, 2);

    let result = pipeline.fetch_prices(&params).await.unwrap();
    let packed = hex::decode(&result.signed_prices[0].packed).unwrap();
    let decoded = YouvesCodec::decode(&packed).unwrap();
    assert_eq!(decoded.symbol, "ETHUSDT");
    assert_eq!(decoded.price, 300_100_000_000);
    assert_eq!(decoded.timestamp, NOW);
}

#[tokio::test]
async fn test_missing_curve_key_fails_pair() {
    let http = http_with(vec![(BNC, 3_000.0), (BNU, 3_002.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let params = params(vec![PairRequest::new("ETH", "USDT")], Protocol::Tezos, 2);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    assert!(err.to_string().contains("Signing error"));
}

#[tokio::test]
async fn test_client_price_within_tolerance_is_emitted() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut pair = PairRequest::new("BTC", "USDT");
    pair.price = Some(OneOrMany::Many(vec![50_510.0, 50_000.0]));
    pair.timestamp = Some(NOW - 30_000);
    let mut params = params(vec![pair], Protocol::Evm, 2);
    params.aggregation = Some(OneOrMany::Many(vec![AggregationType::Median, AggregationType::Max]));

    let result = pipeline.fetch_prices(&params).await.unwrap();
    let info = &result.price_infos[0];
    assert_eq!(info.price[&AggregationType::Median], 5_051_000_000_000);
    assert_eq!(info.price[&AggregationType::Max], 5_100_000_000_000);
    let validation = info.validation.as_ref().unwrap();
    assert!(validation[&AggregationType::Median]);
    assert!(!validation[&AggregationType::Max]);
    assert_eq!(info.timestamp, NOW - 30_000);
    assert_eq!(
        result.signed_prices[0].price_data.price,
        vec![5_051_000_000_000, 5_100_000_000_000]
    );
}

#[tokio::test]
async fn test_client_price_count_mismatch() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut pair = PairRequest::new("BTC", "USDT");
    pair.price = Some(OneOrMany::Many(vec![50_500.0, 1.0]));
    let params = params(vec![pair], Protocol::Evm, 2);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    assert!(err.to_string().contains("Client supplied 2 prices for 1 aggregation types"));
}

#[tokio::test]
async fn test_unsupported_protocol() {
    let http = MockHttp::new();
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 2);
    params.protocol = "Solana".into();

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    assert!(err.to_string().contains("Unsupported protocol: Solana"));
}

#[tokio::test]
async fn test_excessive_deviation() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 2);
    params.max_sources_deviation = Some(100.0);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    assert!(err.to_string().contains("Standard deviation (500)"));
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let mut http = MockHttp::new();
    http.expect_get().times(2).returning(|url, _| {
        let price = if url.contains(BNC) { "50000" } else { "51000" };
        Ok(HttpResponse {
            body: json!([{ "price": price, "time": NOW }]).to_string(),
            certificate: certificate_for(url),
        })
    });
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 2);
    params.exchanges = Some(vec!["BNC".into(), "BNU".into()]);

    let first = pipeline.fetch_prices(&params).await.unwrap();
    let second = pipeline.fetch_prices(&params).await.unwrap();
    assert_eq!(first.price_infos[0].price, second.price_infos[0].price);
    assert_eq!(first.signed_prices[0].packed, second.signed_prices[0].packed);
}

#[tokio::test]
async fn test_decimals_beyond_u128_range_fail_before_fetch() {
    let mut http = MockHttp::new();
    http.expect_get().never();
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut wide = PairRequest::new("BTC", "USDT");
    wide.decimals = Some(39);
    let mut wrapping = PairRequest::new("ETH", "USDT");
    wrapping.decimals = Some(u32::MAX);
    let params = params(vec![wide, wrapping], Protocol::Evm, 2);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    match err {
        OracleError::AllPairsFailed(message) => {
            assert!(message.contains("BTC-USDT: 39 decimals exceeds the maximum of 38"));
            assert!(message.contains(&format!("ETH-USDT: {} decimals", u32::MAX)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_zero_request_limits_fall_back_to_defaults() {
    // A zero trade age limit would reject these one-second-old trades.
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0), (MEXC, 50_500.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let mut pair = PairRequest::new("BTC", "USDT");
    pair.price = Some(OneOrMany::One(50_510.0));
    let mut params = params(vec![pair], Protocol::Evm, 0);
    params.trade_age_limit = Some(0);
    params.max_validation_diff = Some(0.0);

    let result = pipeline.fetch_prices(&params).await.unwrap();
    let info = &result.price_infos[0];
    assert_eq!(info.sources.len(), 3);
    // 0.02% off the median: accepted under the 0.05% default.
    assert_eq!(info.price[&AggregationType::Median], 5_051_000_000_000);
    assert!(info.validation.as_ref().unwrap()[&AggregationType::Median]);
}

#[tokio::test]
async fn test_zero_min_sources_keeps_configured_minimum() {
    let http = http_with(vec![(BNC, 50_000.0), (BNU, 51_000.0)]);
    let pipeline = pipeline(http, echo_signer(Curve::Secp256k1));
    let params = params(vec![PairRequest::new("BTC", "USDT")], Protocol::Evm, 0);

    let err = pipeline.fetch_prices(&params).await.unwrap_err();
    assert!(err.to_string().contains("2 / 3 sources fetched"));
}
