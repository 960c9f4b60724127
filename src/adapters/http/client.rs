//! Certified HTTP Client - Bounded, Retrying Exchange Client
//!
//! Wraps reqwest with a concurrency limit, exponential-backoff retries
//! and TLS provenance: every response is returned with the SHA-256
//! fingerprint of the server's leaf certificate.

use std::sync::Arc;
use std::time::Duration;

use alloy::hex;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::tls::TlsInfo;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::ports::http_client::{HttpClient, HttpResponse};

/// Configuration for the reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpConfig {
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for ReqwestHttpConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(10),
      max_concurrent: 32,
      max_retries: 2,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl From<&HttpConfig> for ReqwestHttpConfig {
  fn from(config: &HttpConfig) -> Self {
    Self {
      timeout: Duration::from_millis(config.timeout_ms),
      max_concurrent: config.max_concurrent,
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
    }
  }
}

/// `HttpClient` over reqwest with rustls.
pub struct ReqwestHttpClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: ReqwestHttpConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl ReqwestHttpClient {
  /// Create a new client.
  pub fn new(config: ReqwestHttpConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .tls_info(true)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  /// Execute a GET with rate limiting and retries.
  async fn execute_with_retry(&self, url: &str, headers: &[(String, String)]) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), url, "Retrying request");
        sleep(delay).await;
      }

      let mut req = self.http.get(url);
      for (name, value) in headers {
        req = req.header(name.as_str(), value.as_str());
      }

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(url, "Rate limited by exchange, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, url, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("HTTP {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, url, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

/// Hex SHA-256 of the peer's leaf certificate, if TLS info is present.
fn certificate_fingerprint(response: &Response) -> Option<String> {
  let der = response.extensions().get::<TlsInfo>()?.peer_certificate()?;
  Some(hex::encode(hmac_sha256::Hash::hash(der)))
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
  async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
    let response = self.execute_with_retry(url, headers).await?;
    let certificate = certificate_fingerprint(&response)
      .with_context(|| format!("No TLS certificate for {url}"))?;
    let body = response
      .text()
      .await
      .with_context(|| format!("Failed to read body from {url}"))?;

    Ok(HttpResponse { body, certificate })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_from_app_config() {
    let app = HttpConfig {
      timeout_ms: 2_500,
      max_concurrent: 4,
      max_retries: 1,
      retry_base_delay_ms: 50,
      user_agent: "ua".into(),
    };
    let config = ReqwestHttpConfig::from(&app);
    assert_eq!(config.timeout, Duration::from_millis(2_500));
    assert_eq!(config.max_concurrent, 4);
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.retry_base_delay, Duration::from_millis(50));
  }

  #[test]
  fn test_client_builds() {
    assert!(ReqwestHttpClient::new(ReqwestHttpConfig::default()).is_ok());
  }
}
