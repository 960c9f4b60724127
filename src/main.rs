//! Price Oracle - Entry Point
//!
//! Answers one `fetchPrices` request read from a JSON file and prints
//! the signed result to stdout.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the secp256k1 key from env (ORACLE_SECP256K1_KEY by default)
//! 4. Build exchange registry, HTTP client and quote cache
//! 5. Run the price pipeline on the request
//! 6. Print the result; dump metrics at debug level

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use price_oracle::adapters::exchanges::default_registry;
use price_oracle::adapters::http::{ReqwestHttpClient, ReqwestHttpConfig};
use price_oracle::adapters::metrics::OracleMetrics;
use price_oracle::adapters::signer::LocalSigner;
use price_oracle::config;
use price_oracle::domain::types::FetchParams;
use price_oracle::ports::clock::{Clock, SystemClock};
use price_oracle::usecases::{PricePipeline, PriceSigner, QuoteCache, QuoteFetcher};

const USAGE: &str = "usage: price-oracle <request.json> [config.toml]";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let request_path = args.next().context(USAGE)?;
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());

    // ── 1. Load configuration ────────────────────────────────
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging (stderr) ───────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting price oracle"
    );

    // ── 3. Read the request ──────────────────────────────────
    let raw = std::fs::read_to_string(&request_path)
        .with_context(|| format!("Failed to read request: {request_path}"))?;
    let params: FetchParams =
        serde_json::from_str(&raw).context("Request is not valid fetchPrices params")?;

    // ── 4. Signing key from env ──────────────────────────────
    let signer = Arc::new(
        LocalSigner::from_env(&config.signer.secp256k1_key_env)
            .context("Failed to load signing key from env")?,
    );

    // ── 5. Adapters and use cases ────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let metrics = Arc::new(OracleMetrics::new().context("Failed to register metrics")?);
    let registry = Arc::new(default_registry(&config.exchanges.enabled));
    let http = Arc::new(
        ReqwestHttpClient::new(ReqwestHttpConfig::from(&config.http))
            .context("Failed to create HTTP client")?,
    );
    let cache = Arc::new(QuoteCache::new(
        config.oracle.cache_duration_ms,
        Arc::clone(&clock),
    ));

    let fetcher = QuoteFetcher::new(
        registry,
        http,
        cache,
        Arc::clone(&clock),
        Arc::clone(&metrics),
    )
    .with_user_agent(config.http.user_agent.clone());

    let pipeline = PricePipeline::new(
        fetcher,
        PriceSigner::new(signer),
        clock,
        config.oracle.clone(),
        Arc::clone(&metrics),
    );

    // ── 6. Run and print ─────────────────────────────────────
    let outcome = pipeline.fetch_prices(&params).await;

    match metrics.render() {
        Ok(text) => debug!(metrics = %text, "Metrics snapshot"),
        Err(e) => debug!(error = %e, "Failed to render metrics"),
    }

    let result = outcome.context("fetchPrices failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    info!(
        signed = result.signed_prices.len(),
        failed = result.price_errors.len(),
        "Done"
    );
    Ok(())
}
