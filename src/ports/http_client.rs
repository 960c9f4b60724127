//! HTTP Client Port - Certified GET Interface
//!
//! The only network primitive the core needs: a GET that returns the
//! body together with a provenance certificate for the response.
//! Timeouts, retries and connection pooling belong to the adapter.

use async_trait::async_trait;

/// Body and provenance of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  /// Raw response body (JSON for every exchange).
  pub body: String,
  /// Hex-encoded provenance proof (e.g. TLS certificate fingerprint).
  pub certificate: String,
}

/// Outbound HTTP GET with provenance.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
  /// Issue a GET request with the given headers.
  async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse>;
}
