//! Last-trade Endpoint - Declarative Exchange Adapter
//!
//! Most exchanges differ only in URL layout, symbol style and where the
//! price and time of the last trade sit in the JSON. `TradeEndpoint`
//! captures those differences as data so each venue is a few lines.

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use serde_json::Value;

use crate::ports::exchange::{ExchangeAdapter, RawTrade};

/// How the pair is written in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStyle {
    /// `BTCUSD`
    Concat,
    /// `BTC-USD`
    Dash,
    /// `BTC_USD`
    Underscore,
    /// `btcusd`
    Lowercase,
    /// `BTCUST` (USDT is listed as UST)
    Bitfinex,
}

impl SymbolStyle {
    pub fn format(self, from: &str, to: &str) -> String {
        match self {
            Self::Concat => format!("{from}{to}"),
            Self::Dash => format!("{from}-{to}"),
            Self::Underscore => format!("{from}_{to}"),
            Self::Lowercase => format!("{from}{to}").to_lowercase(),
            Self::Bitfinex => format!("{}{}", bitfinex_asset(from), bitfinex_asset(to)),
        }
    }
}

fn bitfinex_asset(symbol: &str) -> &str {
    if symbol == "USDT" { "UST" } else { symbol }
}

/// Unit of the trade time field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// Unix milliseconds, number or numeric string.
    Millis,
    /// Unix seconds, possibly fractional.
    Seconds,
    /// ISO-8601 / RFC 3339 string.
    Rfc3339,
}

/// A venue whose last trade sits at fixed JSON pointers.
#[derive(Debug, Clone)]
pub struct TradeEndpoint {
    pub id: &'static str,
    pub name: &'static str,
    /// URL with a `{symbol}` placeholder.
    pub url_template: &'static str,
    pub symbol: SymbolStyle,
    /// RFC 6901 pointer to the price.
    pub price_pointer: &'static str,
    /// RFC 6901 pointer to the trade time.
    pub time_pointer: &'static str,
    pub time_format: TimeFormat,
}

impl ExchangeAdapter for TradeEndpoint {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn url_for(&self, from: &str, to: &str) -> String {
        self.url_template
            .replace("{symbol}", &self.symbol.format(from, to))
    }

    fn extract(&self, response: &Value) -> Result<RawTrade> {
        let price = number_at(response, self.price_pointer)
            .with_context(|| format!("{}: price", self.name))?;
        let time = response
            .pointer(self.time_pointer)
            .ok_or_else(|| anyhow!("{}: missing {}", self.name, self.time_pointer))?;
        let timestamp_ms = timestamp_ms(time, self.time_format)
            .with_context(|| format!("{}: trade time", self.name))?;

        Ok(RawTrade {
            price,
            timestamp_ms,
        })
    }
}

/// Read a number that may be encoded as a JSON number or string.
pub fn number_at(response: &Value, pointer: &str) -> Result<f64> {
    let value = response
        .pointer(pointer)
        .ok_or_else(|| anyhow!("missing {pointer}"))?;
    as_number(value)
}

fn as_number(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("not a float: {n}")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("not a number: {s:?}")),
        other => bail!("unexpected value {other}"),
    }
}

/// Convert a trade time field to Unix milliseconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn timestamp_ms(value: &Value, format: TimeFormat) -> Result<u64> {
    let ms = match format {
        TimeFormat::Millis => as_number(value)?,
        // Sub-second precision is dropped before scaling.
        TimeFormat::Seconds => as_number(value)?.floor() * 1_000.0,
        TimeFormat::Rfc3339 => {
            let text = value
                .as_str()
                .ok_or_else(|| anyhow!("expected a date string, got {value}"))?;
            let parsed = DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("invalid date {text:?}"))?;
            return u64::try_from(parsed.timestamp_millis())
                .map_err(|_| anyhow!("date before epoch: {text}"));
        }
    };

    if !ms.is_finite() || ms < 0.0 {
        bail!("invalid timestamp {ms}");
    }
    Ok(ms.round() as u64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_symbol_styles() {
        assert_eq!(SymbolStyle::Concat.format("BTC", "USDT"), "BTCUSDT");
        assert_eq!(SymbolStyle::Dash.format("BTC", "USD"), "BTC-USD");
        assert_eq!(SymbolStyle::Underscore.format("ETH", "USDT"), "ETH_USDT");
        assert_eq!(SymbolStyle::Lowercase.format("ETH", "USDT"), "ethusdt");
        assert_eq!(SymbolStyle::Bitfinex.format("BTC", "USDT"), "BTCUST");
        assert_eq!(SymbolStyle::Bitfinex.format("USDT", "EUR"), "USTEUR");
    }

    #[test]
    fn test_number_from_string_or_number() {
        let v = json!({ "a": "1.5", "b": 2 });
        assert_eq!(number_at(&v, "/a").unwrap(), 1.5);
        assert_eq!(number_at(&v, "/b").unwrap(), 2.0);
        assert!(number_at(&v, "/c").is_err());
        assert!(number_at(&json!({ "a": "abc" }), "/a").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(timestamp_ms(&json!(1_726_039_366_272_u64), TimeFormat::Millis).unwrap(), 1_726_039_366_272);
        assert_eq!(timestamp_ms(&json!("1726039366272"), TimeFormat::Millis).unwrap(), 1_726_039_366_272);
        assert_eq!(timestamp_ms(&json!(1_726_039_366.789), TimeFormat::Seconds).unwrap(), 1_726_039_366_000);
        assert_eq!(
            timestamp_ms(&json!("2024-09-11T07:22:46.272Z"), TimeFormat::Rfc3339).unwrap(),
            1_726_039_366_272
        );
        assert!(timestamp_ms(&json!(-1), TimeFormat::Millis).is_err());
        assert!(timestamp_ms(&json!(12), TimeFormat::Rfc3339).is_err());
    }
}
