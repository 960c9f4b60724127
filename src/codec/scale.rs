//! SCALE Codec - Substrate-family Payload Layout
//!
//! Record layout, in order:
//! 1. `Vec<u128>` prices (compact length, 16-byte LE each)
//! 2. `u64` timestamp (8-byte LE)
//! 3. `Vec<[u8; 32]>` certificates (compact length, raw bytes)
//! 4. `[u8; 32]` request hash (raw bytes, no length prefix)
//!
//! Signed over `SHA-256(packed)` with the secp256k1 key.

use alloy::primitives::B256;

use super::{PayloadCodec, PricePayload, SigningPayload};
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::types::{Curve, PriceData};

/// Upper bound (exclusive) of single-byte compact mode.
const SINGLE_BYTE_MAX: u128 = 1 << 6;
/// Upper bound (exclusive) of two-byte compact mode.
const TWO_BYTE_MAX: u128 = 1 << 14;
/// Upper bound (exclusive) of four-byte compact mode.
const FOUR_BYTE_MAX: u128 = 1 << 30;

/// Append the SCALE compact encoding of `n`.
pub fn encode_compact(n: u128, out: &mut Vec<u8>) {
    if n < SINGLE_BYTE_MAX {
        out.push((n as u8) << 2);
    } else if n < TWO_BYTE_MAX {
        out.extend_from_slice(&(((n as u16) << 2) | 0b01).to_le_bytes());
    } else if n < FOUR_BYTE_MAX {
        out.extend_from_slice(&(((n as u32) << 2) | 0b10).to_le_bytes());
    } else {
        let bytes = n.to_le_bytes();
        let len = (16 - (n.leading_zeros() / 8) as usize).max(4);
        out.push((((len - 4) as u8) << 2) | 0b11);
        out.extend_from_slice(&bytes[..len]);
    }
}

/// Read a compact integer, rejecting non-canonical forms.
pub fn decode_compact(input: &mut &[u8]) -> OracleResult<u128> {
    let first = take(input, 1)?[0];
    let value = match first & 0b11 {
        0b00 => u128::from(first >> 2),
        0b01 => {
            let rest = take(input, 1)?[0];
            let v = u128::from(u16::from_le_bytes([first, rest]) >> 2);
            ensure_canonical(v >= SINGLE_BYTE_MAX)?;
            v
        }
        0b10 => {
            let rest = take(input, 3)?;
            let v = u128::from(u32::from_le_bytes([first, rest[0], rest[1], rest[2]]) >> 2);
            ensure_canonical(v >= TWO_BYTE_MAX)?;
            v
        }
        _ => {
            let len = usize::from(first >> 2) + 4;
            if len > 16 {
                return Err(OracleError::Decoding(format!(
                    "compact integer of {len} bytes overflows u128"
                )));
            }
            let raw = take(input, len)?;
            let mut buf = [0u8; 16];
            buf[..len].copy_from_slice(raw);
            let v = u128::from_le_bytes(buf);
            ensure_canonical(v >= FOUR_BYTE_MAX && raw[len - 1] != 0)?;
            v
        }
    };
    Ok(value)
}

fn ensure_canonical(ok: bool) -> OracleResult<()> {
    if ok {
        Ok(())
    } else {
        Err(OracleError::Decoding("non-canonical compact integer".into()))
    }
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> OracleResult<&'a [u8]> {
    if input.len() < n {
        return Err(OracleError::Decoding(format!(
            "unexpected end of input: need {n} bytes, have {}",
            input.len()
        )));
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

fn read_len(input: &mut &[u8], item_size: usize) -> OracleResult<usize> {
    let len = decode_compact(input)?;
    // A length can never exceed what is left in the buffer.
    if len > (input.len() / item_size) as u128 {
        return Err(OracleError::Decoding(format!(
            "sequence length {len} exceeds remaining input"
        )));
    }
    Ok(len as usize)
}

/// SCALE codec for Substrate, WASM, Ink! and Gear.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleCodec;

impl ScaleCodec {
    /// Encode the shared payload fields.
    pub fn encode_payload(payload: &PricePayload) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            2 + payload.prices.len() * 16 + 8 + 2 + payload.certificates.len() * 32 + 32,
        );
        encode_compact(payload.prices.len() as u128, &mut out);
        for price in &payload.prices {
            out.extend_from_slice(&price.to_le_bytes());
        }
        out.extend_from_slice(&payload.timestamp.to_le_bytes());
        encode_compact(payload.certificates.len() as u128, &mut out);
        for cert in &payload.certificates {
            out.extend_from_slice(cert.as_slice());
        }
        out.extend_from_slice(payload.request_hash.as_slice());
        out
    }

    /// Decode a packed record; trailing bytes are an error.
    pub fn decode(packed: &[u8]) -> OracleResult<PricePayload> {
        let mut input = packed;

        let n_prices = read_len(&mut input, 16)?;
        let mut prices = Vec::with_capacity(n_prices);
        for _ in 0..n_prices {
            let raw = take(&mut input, 16)?;
            let mut buf = [0u8; 16];
            buf.copy_from_slice(raw);
            prices.push(u128::from_le_bytes(buf));
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(take(&mut input, 8)?);
        let timestamp = u64::from_le_bytes(ts);

        let n_certs = read_len(&mut input, 32)?;
        let mut certificates = Vec::with_capacity(n_certs);
        for _ in 0..n_certs {
            certificates.push(B256::from_slice(take(&mut input, 32)?));
        }

        let request_hash = B256::from_slice(take(&mut input, 32)?);

        if !input.is_empty() {
            return Err(OracleError::Decoding(format!(
                "{} trailing bytes after SCALE record",
                input.len()
            )));
        }

        Ok(PricePayload {
            prices,
            timestamp,
            certificates,
            request_hash,
        })
    }
}

impl PayloadCodec for ScaleCodec {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn encode(&self, data: &PriceData) -> OracleResult<Vec<u8>> {
        Ok(Self::encode_payload(&PricePayload::from(data)))
    }

    fn signing_payload(&self, packed: &[u8]) -> SigningPayload {
        SigningPayload::Digest(B256::from(hmac_sha256::Hash::hash(packed)))
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }
}
