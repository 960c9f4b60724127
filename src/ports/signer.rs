//! Signer Port - Key Custody Boundary
//!
//! Keys never enter the core. The pipeline decides what to sign (see
//! `codec::SigningPayload`) and which curve signs it; the signer only
//! holds keys and produces signatures.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::codec::SigningPayload;
use crate::domain::types::Curve;

/// Signing capability keyed by curve.
#[async_trait]
pub trait Signer: Send + Sync + 'static {
  /// Sign the payload with the key on `curve`.
  async fn sign(&self, payload: &SigningPayload, curve: Curve) -> anyhow::Result<Vec<u8>>;

  /// Hex-encoded public key per curve.
  fn public_keys(&self) -> HashMap<Curve, String>;
}
