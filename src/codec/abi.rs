//! ABI Codec - EVM Payload Layout
//!
//! Encodes `(uint128[] prices, uint64 timestamp, bytes32[] certificates,
//! bytes32 requestHash)` as a single tuple parameter, identical to
//! `abi.encode(payload)` in Solidity. Because the tuple is dynamic the
//! output starts with a 0x20 head offset, followed by the tuple's own
//! head (two tail offsets and two static words) and the array tails.
//!
//! Signed over `keccak256(packed)` with the secp256k1 key, which is
//! what a contract recovers with `ecrecover(keccak256(payload), ...)`.

use alloy::primitives::keccak256;
use alloy::sol;
use alloy::sol_types::{SolType, SolValue};

use super::{PayloadCodec, PricePayload, SigningPayload};
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::types::{Curve, PriceData};

sol! {
    /// On-chain view of a signed price.
    #[derive(Debug, PartialEq, Eq)]
    struct AbiPricePayload {
        uint128[] prices;
        uint64 timestamp;
        bytes32[] certificates;
        bytes32 requestHash;
    }
}

impl From<&PricePayload> for AbiPricePayload {
    fn from(p: &PricePayload) -> Self {
        Self {
            prices: p.prices.clone(),
            timestamp: p.timestamp,
            certificates: p.certificates.clone(),
            requestHash: p.request_hash,
        }
    }
}

impl From<AbiPricePayload> for PricePayload {
    fn from(p: AbiPricePayload) -> Self {
        Self {
            prices: p.prices,
            timestamp: p.timestamp,
            certificates: p.certificates,
            request_hash: p.requestHash,
        }
    }
}

/// ABI codec for EVM chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiCodec;

impl AbiCodec {
    /// Decode a packed tuple, validating padding and offsets.
    pub fn decode(packed: &[u8]) -> OracleResult<PricePayload> {
        <AbiPricePayload as SolType>::abi_decode(packed, true)
            .map(PricePayload::from)
            .map_err(|e| OracleError::Decoding(format!("ABI payload: {e}")))
    }
}

impl PayloadCodec for AbiCodec {
    fn name(&self) -> &'static str {
        "abi"
    }

    fn encode(&self, data: &PriceData) -> OracleResult<Vec<u8>> {
        Ok(AbiPricePayload::from(&PricePayload::from(data)).abi_encode())
    }

    fn signing_payload(&self, packed: &[u8]) -> SigningPayload {
        SigningPayload::Digest(keccak256(packed))
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }
}
