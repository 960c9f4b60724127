//! Request Hasher - Canonical Request Binding
//!
//! Computes `SHA-256(canonical_json(params))` once per batch. Every
//! signed payload of the batch embeds this hash, so a verifier who
//! knows the request it sent can confirm the signature was produced for
//! exactly that request.
//!
//! Canonical JSON rules:
//! - object keys sorted lexicographically at every depth
//! - no whitespace
//! - absent optional fields are omitted (never `null`)
//! - integers print as-is; other numbers follow ECMAScript
//!   `Number::toString` (`50500`, `0.05`, `1e-7`, `1e+21`), so a
//!   verifier using `JSON.stringify` arrives at the same text

use std::fmt::Write as _;
use std::iter;

use alloy::primitives::B256;
use serde::Serialize;
use serde_json::Value;

use super::error::{OracleError, OracleResult};

/// Hash any serializable request.
///
/// # Errors
/// `Encoding` if the value cannot be represented as JSON.
pub fn hash_request<T: Serialize>(params: &T) -> OracleResult<B256> {
    let value = serde_json::to_value(params)
        .map_err(|e| OracleError::Encoding(format!("request is not JSON-serializable: {e}")))?;
    Ok(B256::from(hmac_sha256::Hash::hash(canonical_json(&value).as_bytes())))
}

/// Canonical JSON text of a value.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if n.is_i64() || n.is_u64() {
        let _ = write!(out, "{n}");
        return;
    }
    match n.as_f64() {
        Some(f) => write_ecma_number(f, out),
        None => {
            let _ = write!(out, "{n}");
        }
    }
}

/// ECMAScript `Number::toString` for a finite double.
///
/// Takes the shortest round-trip digits from `{:e}` and places the
/// decimal point with the same thresholds JavaScript uses: plain
/// notation for decimal exponents in `[-6, 21)`, scientific otherwise.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn write_ecma_number(f: f64, out: &mut String) {
    if f == 0.0 {
        out.push('0');
        return;
    }
    if f < 0.0 {
        out.push('-');
    }

    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(iter::repeat_n('0', (n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(iter::repeat_n('0', (-n) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let e = n - 1;
        let _ = write!(out, "e{}{}", if e < 0 { '-' } else { '+' }, e.abs());
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json's string escaping is already canonical.
    out.push_str(&Value::String(s.to_string()).to_string());
}
