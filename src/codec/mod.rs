//! Protocol Codecs - Canonical Payload Encoding
//!
//! One codec per target chain family. Each codec lays out `PriceData`
//! in that chain's native binary format, decides what exactly gets
//! handed to the signer (digest or raw bytes) and which curve signs it.
//!
//! Codecs:
//! - `scale`: SCALE record for Substrate, WASM, Ink! and Gear
//! - `abi`: Solidity ABI tuple for EVM chains
//! - `michelson`: Micheline `PACK` for Tezos and Youves
//!
//! Encoding is a pure function of `PriceData`: two implementations fed
//! the same record must produce byte-identical payloads.

pub mod abi;
pub mod michelson;
pub mod scale;

use alloy::primitives::B256;

use crate::domain::error::OracleResult;
use crate::domain::types::{Curve, PriceData, Protocol};

pub use abi::AbiCodec;
pub use michelson::{TezosCodec, YouvesCodec};
pub use scale::ScaleCodec;

/// What the signer receives for one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningPayload {
    /// A 32-byte digest computed by the codec.
    Digest(B256),
    /// The packed bytes themselves; the signer hashes them.
    Raw(Vec<u8>),
}

impl SigningPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Digest(d) => d.as_slice(),
            Self::Raw(b) => b,
        }
    }
}

/// Fields shared by the full-record layouts (SCALE, ABI, Tezos).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePayload {
    pub prices: Vec<u128>,
    pub timestamp: u64,
    pub certificates: Vec<B256>,
    pub request_hash: B256,
}

impl From<&PriceData> for PricePayload {
    fn from(data: &PriceData) -> Self {
        Self {
            prices: data.price.clone(),
            timestamp: data.timestamp,
            certificates: data.certificates(),
            request_hash: data.request_hash,
        }
    }
}

/// A chain family's encoding and signing rules.
pub trait PayloadCodec: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Lay out the record in the family's wire format.
    ///
    /// # Errors
    /// `Encoding` when the record does not fit the layout.
    fn encode(&self, data: &PriceData) -> OracleResult<Vec<u8>>;

    /// Select what the signer signs for the given packed bytes.
    fn signing_payload(&self, packed: &[u8]) -> SigningPayload;

    /// Curve whose key signs this family's payloads.
    fn curve(&self) -> Curve;
}

/// Codec for a protocol. Adding a protocol means adding an arm here.
pub fn codec_for(protocol: Protocol) -> &'static dyn PayloadCodec {
    match protocol {
        Protocol::Substrate | Protocol::Wasm | Protocol::Ink | Protocol::Gear => &ScaleCodec,
        Protocol::Evm => &AbiCodec,
        Protocol::Tezos => &TezosCodec,
        Protocol::Youves => &YouvesCodec,
    }
}

/// SOL/USDT record with two sources, shared by the codec tests.
#[cfg(test)]
pub(crate) fn sample_price_data() -> PriceData {
    use crate::domain::types::PriceDataSource;

    PriceData {
        from: "SOL".into(),
        to: "USDT".into(),
        decimals: 9,
        price: vec![131_975_000_000, 131_990_000_000],
        timestamp: 1_726_039_366_272,
        sources: vec![
            PriceDataSource {
                exchange_id: "BNU".into(),
                certificate: B256::repeat_byte(0xef),
            },
            PriceDataSource {
                exchange_id: "CBP".into(),
                certificate: B256::repeat_byte(0xdf),
            },
        ],
        request_hash: B256::repeat_byte(0xc5),
    }
}
