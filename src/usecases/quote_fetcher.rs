//! Quote Fetcher - Concurrent Multi-exchange Collection
//!
//! For one pair: pick the allowed exchanges, reuse whatever the cache
//! still holds, and ask every remaining exchange for its last trade in
//! parallel. One exchange failing never affects the others; it only
//! shrinks the set of quotes handed to the aggregator.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::adapters::metrics::OracleMetrics;
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::types::{pair_label, Quote};
use crate::ports::clock::Clock;
use crate::ports::exchange::{ExchangeAdapter, ExchangeRegistry};
use crate::ports::http_client::HttpClient;

use super::quote_cache::QuoteCache;

/// Browser user-agent some exchanges require before they answer.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/28.0.1500.52 Safari/537.36";

/// Fans out last-trade requests and merges them with cached quotes.
pub struct QuoteFetcher {
  registry: Arc<ExchangeRegistry>,
  http: Arc<dyn HttpClient>,
  cache: Arc<QuoteCache>,
  clock: Arc<dyn Clock>,
  metrics: Arc<OracleMetrics>,
  user_agent: String,
}

impl QuoteFetcher {
  pub fn new(
    registry: Arc<ExchangeRegistry>,
    http: Arc<dyn HttpClient>,
    cache: Arc<QuoteCache>,
    clock: Arc<dyn Clock>,
    metrics: Arc<OracleMetrics>,
  ) -> Self {
    Self {
      registry,
      http,
      cache,
      clock,
      metrics,
      user_agent: DEFAULT_USER_AGENT.to_string(),
    }
  }

  /// Override the user-agent header sent to exchanges.
  pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = user_agent.into();
    self
  }

  /// Collect usable quotes for a pair, at most one per exchange.
  ///
  /// Never fails: exchanges that error out are logged and skipped, so
  /// the result may be empty.
  #[instrument(skip(self, allow_list), fields(pair = %pair_label(from, to)))]
  pub async fn fetch(
    &self,
    from: &str,
    to: &str,
    allow_list: Option<&[String]>,
    trade_age_limit_ms: u64,
  ) -> Vec<Quote> {
    let adapters = self.registry.select(allow_list);
    let ids: Vec<String> = adapters.iter().map(|a| a.id().to_string()).collect();

    let cached = self.cache.get_all(from, to, Some(&ids));
    let mut quotes: Vec<Quote> = Vec::with_capacity(adapters.len());
    let mut seen: HashSet<String> = HashSet::new();
    for entry in cached {
      for source in entry.sources {
        if seen.insert(source.exchange_id.clone()) {
          quotes.push(Quote {
            price: entry.price,
            timestamp: entry.timestamp,
            exchange_id: source.exchange_id,
            certificate: source.certificate,
          });
        }
      }
    }
    self.metrics.cache_hits.inc_by(quotes.len() as u64);

    let pending: Vec<&Arc<dyn ExchangeAdapter>> = adapters
      .iter()
      .filter(|a| !seen.contains(a.id()))
      .collect();

    debug!(cached = quotes.len(), pending = pending.len(), "Fetching quotes");

    let results = join_all(
      pending
        .iter()
        .map(|adapter| self.fetch_one(Arc::as_ref(adapter), from, to, trade_age_limit_ms)),
    )
    .await;

    for (adapter, result) in pending.iter().zip(results) {
      match result {
        Ok(quote) => {
          self.metrics.quotes_fetched.with_label_values(&[adapter.id()]).inc();
          quotes.push(quote);
        }
        Err(e) => {
          warn!(exchange = adapter.id(), error = %e, "Quote rejected");
          self
            .metrics
            .quotes_rejected
            .with_label_values(&[adapter.id(), e.kind()])
            .inc();
        }
      }
    }

    quotes
  }

  /// One exchange round trip: request, parse, validate, cache.
  async fn fetch_one(
    &self,
    adapter: &dyn ExchangeAdapter,
    from: &str,
    to: &str,
    trade_age_limit_ms: u64,
  ) -> OracleResult<Quote> {
    let exchange = adapter.id();
    let source_err = |reason: String| OracleError::Source {
      exchange: exchange.to_string(),
      reason,
    };

    let url = adapter.url_for(from, to);
    let headers = [("User-Agent".to_string(), self.user_agent.clone())];
    let response = self
      .http
      .get(&url, &headers)
      .await
      .map_err(|e| source_err(format!("{e:#}")))?;

    let json: Value = serde_json::from_str(&response.body)
      .map_err(|e| source_err(format!("invalid JSON: {e}")))?;
    let trade = adapter
      .extract(&json)
      .map_err(|e| source_err(format!("{e:#}")))?;

    if !trade.price.is_finite() || trade.price <= 0.0 {
      return Err(OracleError::InvalidQuote {
        exchange: exchange.to_string(),
        price: trade.price,
      });
    }

    let age_ms = self.clock.now_ms().saturating_sub(trade.timestamp_ms);
    if age_ms > trade_age_limit_ms {
      return Err(OracleError::StaleTrade {
        exchange: exchange.to_string(),
        age_ms,
        limit_ms: trade_age_limit_ms,
      });
    }

    self
      .cache
      .set(from, to, exchange, trade.price, &response.certificate);

    Ok(Quote {
      price: trade.price,
      timestamp: trade.timestamp_ms,
      exchange_id: exchange.to_string(),
      certificate: response.certificate,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use anyhow::{anyhow, Context};
  use async_trait::async_trait;

  use super::*;
  use crate::ports::clock::ManualClock;
  use crate::ports::exchange::RawTrade;
  use crate::ports::http_client::HttpResponse;

  const NOW: u64 = 1_726_039_366_272;

  struct FlatAdapter(&'static str);

  impl ExchangeAdapter for FlatAdapter {
    fn id(&self) -> &str {
      self.0
    }

    fn name(&self) -> &str {
      self.0
    }

    fn url_for(&self, from: &str, to: &str) -> String {
      format!("https://{}/{from}{to}", self.0)
    }

    fn extract(&self, response: &Value) -> anyhow::Result<RawTrade> {
      Ok(RawTrade {
        price: response["price"].as_f64().context("price")?,
        timestamp_ms: response["time"].as_u64().context("time")?,
      })
    }
  }

  #[derive(Default)]
  struct StubHttp {
    bodies: HashMap<String, String>,
    calls: AtomicUsize,
  }

  impl StubHttp {
    fn with(mut self, url: &str, body: String) -> Self {
      self.bodies.insert(url.to_string(), body);
      self
    }
  }

  #[async_trait]
  impl HttpClient for StubHttp {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      assert!(headers.iter().any(|(k, v)| k == "User-Agent" && v == DEFAULT_USER_AGENT));
      let body = self.bodies.get(url).cloned().ok_or_else(|| anyhow!("connection refused"))?;
      Ok(HttpResponse {
        body,
        certificate: format!("cert-{url}"),
      })
    }
  }

  fn trade(price: f64, time: u64) -> String {
    serde_json::json!({ "price": price, "time": time }).to_string()
  }

  fn fetcher(http: Arc<StubHttp>) -> (QuoteFetcher, Arc<QuoteCache>, ManualClock) {
    let clock = ManualClock::new(NOW);
    let cache = Arc::new(QuoteCache::new(60_000, Arc::new(clock.clone())));
    let registry = Arc::new(ExchangeRegistry::new(vec![
      Arc::new(FlatAdapter("AAA")),
      Arc::new(FlatAdapter("BBB")),
      Arc::new(FlatAdapter("CCC")),
    ]));
    let fetcher = QuoteFetcher::new(
      registry,
      http,
      Arc::clone(&cache),
      Arc::new(clock.clone()),
      Arc::new(OracleMetrics::new().unwrap()),
    );
    (fetcher, cache, clock)
  }

  #[tokio::test]
  async fn test_failures_are_isolated() {
    let http = Arc::new(
      StubHttp::default()
        .with("https://AAA/BTCUSD", trade(50_000.0, NOW - 1_000))
        .with("https://BBB/BTCUSD", "not json".into()),
    );
    let (fetcher, _, _) = fetcher(Arc::clone(&http));

    let quotes = fetcher.fetch("BTC", "USD", None, 300_000).await;
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].exchange_id, "AAA");
    assert_eq!(quotes[0].certificate, "cert-https://AAA/BTCUSD");
    assert_eq!(http.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_rejects_stale_and_invalid_prices() {
    let http = Arc::new(
      StubHttp::default()
        .with("https://AAA/BTCUSD", trade(50_000.0, NOW - 300_001))
        .with("https://BBB/BTCUSD", trade(0.0, NOW))
        .with("https://CCC/BTCUSD", trade(50_100.0, NOW - 300_000)),
    );
    let (fetcher, _, _) = fetcher(http);

    let quotes = fetcher.fetch("BTC", "USD", None, 300_000).await;
    let ids: Vec<_> = quotes.iter().map(|q| q.exchange_id.as_str()).collect();
    assert_eq!(ids, vec!["CCC"]);
  }

  #[tokio::test]
  async fn test_cache_hit_skips_exchange() {
    let http = Arc::new(StubHttp::default().with("https://AAA/ETHUSD", trade(3_000.0, NOW)));
    let (fetcher, cache, clock) = fetcher(Arc::clone(&http));
    let allow = vec!["AAA".to_string()];

    let first = fetcher.fetch("ETH", "USD", Some(&allow), 300_000).await;
    assert_eq!(first.len(), 1);
    assert_eq!(cache.len(), 1);

    clock.advance(5_000);
    let second = fetcher.fetch("ETH", "USD", Some(&allow), 300_000).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].price, 3_000.0);
    assert_eq!(second[0].timestamp, NOW);
    assert_eq!(http.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_unknown_exchange_is_skipped() {
    let http = Arc::new(StubHttp::default().with("https://BBB/BTCUSD", trade(50_000.0, NOW)));
    let (fetcher, _, _) = fetcher(Arc::clone(&http));
    let allow = vec!["ZZZ".to_string(), "BBB".to_string()];

    let quotes = fetcher.fetch("BTC", "USD", Some(&allow), 300_000).await;
    assert_eq!(quotes.len(), 1);
    assert_eq!(http.calls.load(Ordering::SeqCst), 1);
  }
}
