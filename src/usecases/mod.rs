//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic through port interfaces. Each use case
//! represents one stage of answering a `fetch_prices` request.
//!
//! - `quote_cache`: TTL memory of recent per-exchange quotes
//! - `quote_fetcher`: Concurrent fan-out to exchanges with cache merge
//! - `price_signer`: Protocol encoding and signing of one pair
//! - `price_pipeline`: Batch orchestration and per-pair state machine

pub mod price_pipeline;
pub mod price_signer;
pub mod quote_cache;
pub mod quote_fetcher;

pub use price_pipeline::PricePipeline;
pub use price_signer::PriceSigner;
pub use quote_cache::QuoteCache;
pub use quote_fetcher::QuoteFetcher;
