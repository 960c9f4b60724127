//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP, exchange APIs, keys). Each sub-module
//! groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `exchanges`: URL and response shape of every supported venue
//! - `http`: reqwest client with retries and TLS fingerprints
//! - `metrics`: Prometheus counters
//! - `signer`: In-process secp256k1 key

pub mod exchanges;
pub mod http;
pub mod metrics;
pub mod signer;
