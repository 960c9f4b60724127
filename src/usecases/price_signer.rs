//! Price Signer - Encode and Sign One PriceInfo
//!
//! Derives `PriceData` from a finished `PriceInfo`, lays it out with
//! the protocol's codec and asks the signer port for a signature on
//! the curve that protocol expects.

use std::sync::Arc;

use alloy::hex;
use alloy::primitives::B256;
use tracing::debug;

use crate::codec::{codec_for, SigningPayload};
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::types::{Curve, PriceData, PriceInfo, Protocol, SignedPrice};
use crate::ports::signer::Signer;

/// A `PriceData` laid out for one protocol, ready for the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPrice {
  pub price_data: PriceData,
  pub packed: Vec<u8>,
  pub payload: SigningPayload,
  pub curve: Curve,
}

pub struct PriceSigner {
  signer: Arc<dyn Signer>,
}

impl PriceSigner {
  pub fn new(signer: Arc<dyn Signer>) -> Self {
    Self { signer }
  }

  /// Derive `PriceData` and encode it for `protocol`.
  ///
  /// # Errors
  /// `Encoding` if the record does not fit the protocol layout.
  pub fn encode(
    &self,
    info: &PriceInfo,
    protocol: Protocol,
    request_hash: B256,
  ) -> OracleResult<EncodedPrice> {
    let price_data = PriceData::from_info(info, request_hash)?;
    let codec = codec_for(protocol);
    let packed = codec.encode(&price_data)?;
    let payload = codec.signing_payload(&packed);

    debug!(codec = codec.name(), packed_len = packed.len(), "Price encoded");

    Ok(EncodedPrice {
      price_data,
      packed,
      payload,
      curve: codec.curve(),
    })
  }

  /// Sign an encoded price.
  ///
  /// # Errors
  /// `Signing` if no key exists for the curve or the signer fails.
  pub async fn sign(&self, encoded: EncodedPrice) -> OracleResult<SignedPrice> {
    let curve = encoded.curve;
    let pub_key = self
      .signer
      .public_keys()
      .remove(&curve)
      .ok_or_else(|| OracleError::Signing(format!("no {curve} key configured")))?;

    let signature = self
      .signer
      .sign(&encoded.payload, curve)
      .await
      .map_err(|e| OracleError::Signing(format!("{e:#}")))?;

    Ok(SignedPrice {
      price_data: encoded.price_data,
      packed: hex::encode(&encoded.packed),
      signature: hex::encode(&signature),
      pub_key,
    })
  }
}
