//! Michelson Codec - Tezos-family Payload Layout
//!
//! Produces the output of Michelson `PACK`: a `0x05` tag followed by
//! the binary Micheline encoding of the value. Pairs are right combs.
//!
//! - Tezos: `Pair {price..} (Pair timestamp (Pair {certificate..} request_hash))`
//! - Youves: `Pair timestamp (Pair "FROMTO" price)`
//!
//! The packed bytes are handed to the p256 signer unhashed; the Tezos
//! signer applies its own blake2b digest.

use super::{PayloadCodec, PricePayload, SigningPayload};
use crate::domain::error::{OracleError, OracleResult};
use crate::domain::types::{Curve, PriceData};

use alloy::primitives::B256;

/// Leading byte of packed Michelson data.
const PACK_TAG: u8 = 0x05;

const TAG_INT: u8 = 0x00;
const TAG_STRING: u8 = 0x01;
const TAG_SEQ: u8 = 0x02;
const TAG_PRIM_2_ARGS: u8 = 0x07;
const TAG_BYTES: u8 = 0x0a;
const PRIM_PAIR: u8 = 0x07;

/// Subset of Micheline needed for price payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Micheline {
    /// Non-negative integer (`nat`, `timestamp`).
    Int(u128),
    String(String),
    Bytes(Vec<u8>),
    Seq(Vec<Micheline>),
    Pair(Box<Micheline>, Box<Micheline>),
}

impl Micheline {
    fn pair(a: Self, b: Self) -> Self {
        Self::Pair(Box::new(a), Box::new(b))
    }

    /// Binary Micheline encoding (without the pack tag).
    pub fn encode(&self, out: &mut Vec<u8>) -> OracleResult<()> {
        match self {
            Self::Int(n) => {
                out.push(TAG_INT);
                encode_zarith(*n, out);
            }
            Self::String(s) => {
                out.push(TAG_STRING);
                push_len_prefixed(s.as_bytes(), out)?;
            }
            Self::Bytes(b) => {
                out.push(TAG_BYTES);
                push_len_prefixed(b, out)?;
            }
            Self::Seq(items) => {
                let mut body = Vec::new();
                for item in items {
                    item.encode(&mut body)?;
                }
                out.push(TAG_SEQ);
                push_len_prefixed(&body, out)?;
            }
            Self::Pair(a, b) => {
                out.push(TAG_PRIM_2_ARGS);
                out.push(PRIM_PAIR);
                a.encode(out)?;
                b.encode(out)?;
            }
        }
        Ok(())
    }

    /// Parse one expression from the front of `input`.
    pub fn decode(input: &mut &[u8]) -> OracleResult<Self> {
        let tag = take(input, 1)?[0];
        match tag {
            TAG_INT => Ok(Self::Int(decode_zarith(input)?)),
            TAG_STRING => {
                let raw = take_len_prefixed(input)?;
                String::from_utf8(raw.to_vec())
                    .map(Self::String)
                    .map_err(|e| OracleError::Decoding(format!("string is not UTF-8: {e}")))
            }
            TAG_BYTES => Ok(Self::Bytes(take_len_prefixed(input)?.to_vec())),
            TAG_SEQ => {
                let mut body = take_len_prefixed(input)?;
                let mut items = Vec::new();
                while !body.is_empty() {
                    items.push(Self::decode(&mut body)?);
                }
                Ok(Self::Seq(items))
            }
            TAG_PRIM_2_ARGS => {
                let prim = take(input, 1)?[0];
                if prim != PRIM_PAIR {
                    return Err(OracleError::Decoding(format!("unexpected primitive 0x{prim:02x}")));
                }
                let a = Self::decode(input)?;
                let b = Self::decode(input)?;
                Ok(Self::pair(a, b))
            }
            other => Err(OracleError::Decoding(format!("unsupported Micheline tag 0x{other:02x}"))),
        }
    }
}

/// Zarith encoding of a non-negative integer: the first byte carries
/// 6 value bits and a zero sign bit, later bytes 7 bits each.
fn encode_zarith(n: u128, out: &mut Vec<u8>) {
    let mut first = (n & 0x3f) as u8;
    let mut rest = n >> 6;
    if rest != 0 {
        first |= 0x80;
    }
    out.push(first);
    while rest != 0 {
        let mut byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

fn decode_zarith(input: &mut &[u8]) -> OracleResult<u128> {
    let first = take(input, 1)?[0];
    if first & 0x40 != 0 {
        return Err(OracleError::Decoding("negative integers are not valid prices".into()));
    }
    let mut value = u128::from(first & 0x3f);
    let mut shift = 6u32;
    let mut more = first & 0x80 != 0;
    while more {
        let byte = take(input, 1)?[0];
        if shift >= 128 || (shift > 121 && u128::from(byte & 0x7f) >> (128 - shift) != 0) {
            return Err(OracleError::Decoding("integer overflows u128".into()));
        }
        value |= u128::from(byte & 0x7f) << shift;
        shift += 7;
        more = byte & 0x80 != 0;
    }
    Ok(value)
}

fn push_len_prefixed(bytes: &[u8], out: &mut Vec<u8>) -> OracleResult<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| OracleError::Encoding("Micheline node exceeds 4 GiB".into()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn take_len_prefixed<'a>(input: &mut &'a [u8]) -> OracleResult<&'a [u8]> {
    let raw = take(input, 4)?;
    let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    take(input, len)
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> OracleResult<&'a [u8]> {
    if input.len() < n {
        return Err(OracleError::Decoding("unexpected end of Micheline data".into()));
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

/// `0x05 ++ encode(value)`.
pub fn pack(value: &Micheline) -> OracleResult<Vec<u8>> {
    let mut out = vec![PACK_TAG];
    value.encode(&mut out)?;
    Ok(out)
}

/// Inverse of `pack`; trailing bytes are an error.
pub fn unpack(packed: &[u8]) -> OracleResult<Micheline> {
    let mut input = packed;
    if take(&mut input, 1)?[0] != PACK_TAG {
        return Err(OracleError::Decoding("missing 0x05 pack tag".into()));
    }
    let value = Micheline::decode(&mut input)?;
    if !input.is_empty() {
        return Err(OracleError::Decoding(format!("{} trailing bytes after packed value", input.len())));
    }
    Ok(value)
}

fn expect_int(node: Micheline, what: &str) -> OracleResult<u128> {
    match node {
        Micheline::Int(n) => Ok(n),
        other => Err(OracleError::Decoding(format!("{what}: expected int, got {other:?}"))),
    }
}

fn expect_pair(node: Micheline, what: &str) -> OracleResult<(Micheline, Micheline)> {
    match node {
        Micheline::Pair(a, b) => Ok((*a, *b)),
        other => Err(OracleError::Decoding(format!("{what}: expected pair, got {other:?}"))),
    }
}

fn expect_seq(node: Micheline, what: &str) -> OracleResult<Vec<Micheline>> {
    match node {
        Micheline::Seq(items) => Ok(items),
        other => Err(OracleError::Decoding(format!("{what}: expected sequence, got {other:?}"))),
    }
}

fn expect_bytes32(node: Micheline, what: &str) -> OracleResult<B256> {
    match node {
        Micheline::Bytes(b) if b.len() == 32 => Ok(B256::from_slice(&b)),
        other => Err(OracleError::Decoding(format!("{what}: expected 32 bytes, got {other:?}"))),
    }
}

fn timestamp_from(n: u128) -> OracleResult<u64> {
    u64::try_from(n).map_err(|_| OracleError::Decoding(format!("timestamp {n} overflows u64")))
}

/// Full-record codec for Tezos.
#[derive(Debug, Clone, Copy, Default)]
pub struct TezosCodec;

impl TezosCodec {
    pub fn to_micheline(payload: &PricePayload) -> Micheline {
        Micheline::pair(
            Micheline::Seq(payload.prices.iter().map(|p| Micheline::Int(*p)).collect()),
            Micheline::pair(
                Micheline::Int(u128::from(payload.timestamp)),
                Micheline::pair(
                    Micheline::Seq(
                        payload
                            .certificates
                            .iter()
                            .map(|c| Micheline::Bytes(c.to_vec()))
                            .collect(),
                    ),
                    Micheline::Bytes(payload.request_hash.to_vec()),
                ),
            ),
        )
    }

    pub fn decode(packed: &[u8]) -> OracleResult<PricePayload> {
        let (prices, rest) = expect_pair(unpack(packed)?, "payload")?;
        let (timestamp, rest) = expect_pair(rest, "payload tail")?;
        let (certificates, request_hash) = expect_pair(rest, "certificates")?;

        Ok(PricePayload {
            prices: expect_seq(prices, "prices")?
                .into_iter()
                .map(|p| expect_int(p, "price"))
                .collect::<OracleResult<_>>()?,
            timestamp: timestamp_from(expect_int(timestamp, "timestamp")?)?,
            certificates: expect_seq(certificates, "certificates")?
                .into_iter()
                .map(|c| expect_bytes32(c, "certificate"))
                .collect::<OracleResult<_>>()?,
            request_hash: expect_bytes32(request_hash, "request hash")?,
        })
    }
}

impl PayloadCodec for TezosCodec {
    fn name(&self) -> &'static str {
        "michelson"
    }

    fn encode(&self, data: &PriceData) -> OracleResult<Vec<u8>> {
        pack(&Self::to_micheline(&PricePayload::from(data)))
    }

    fn signing_payload(&self, packed: &[u8]) -> SigningPayload {
        SigningPayload::Raw(packed.to_vec())
    }

    fn curve(&self) -> Curve {
        Curve::P256
    }
}

/// Fields of the Youves oracle payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouvesPayload {
    pub timestamp: u64,
    /// Concatenated pair symbol, e.g. `BTCUSD`.
    pub symbol: String,
    pub price: u128,
}

/// Compact `{timestamp, symbol, price}` codec for Youves.
#[derive(Debug, Clone, Copy, Default)]
pub struct YouvesCodec;

impl YouvesCodec {
    pub fn to_micheline(payload: &YouvesPayload) -> Micheline {
        Micheline::pair(
            Micheline::Int(u128::from(payload.timestamp)),
            Micheline::pair(
                Micheline::String(payload.symbol.clone()),
                Micheline::Int(payload.price),
            ),
        )
    }

    pub fn decode(packed: &[u8]) -> OracleResult<YouvesPayload> {
        let (timestamp, rest) = expect_pair(unpack(packed)?, "payload")?;
        let (symbol, price) = expect_pair(rest, "payload tail")?;
        let symbol = match symbol {
            Micheline::String(s) => s,
            other => {
                return Err(OracleError::Decoding(format!("symbol: expected string, got {other:?}")));
            }
        };
        Ok(YouvesPayload {
            timestamp: timestamp_from(expect_int(timestamp, "timestamp")?)?,
            symbol,
            price: expect_int(price, "price")?,
        })
    }
}

impl PayloadCodec for YouvesCodec {
    fn name(&self) -> &'static str {
        "michelson-youves"
    }

    fn encode(&self, data: &PriceData) -> OracleResult<Vec<u8>> {
        let price = *data.price.first().ok_or_else(|| {
            OracleError::Encoding(format!("no price to pack for {}{}", data.from, data.to))
        })?;
        pack(&Self::to_micheline(&YouvesPayload {
            timestamp: data.timestamp,
            symbol: format!("{}{}", data.from, data.to),
            price,
        }))
    }

    fn signing_payload(&self, packed: &[u8]) -> SigningPayload {
        SigningPayload::Raw(packed.to_vec())
    }

    fn curve(&self) -> Curve {
        Curve::P256
    }
}
