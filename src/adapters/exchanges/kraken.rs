//! Kraken - Trades Endpoint
//!
//! Kraken keys the trade list by its own pair name (`XXBTZUSD` for
//! `BTCUSD`), next to a `last` cursor, so the list has to be found by
//! shape rather than by a fixed pointer.

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use super::endpoint::{number_at, timestamp_ms, TimeFormat};
use crate::ports::exchange::{ExchangeAdapter, RawTrade};

#[derive(Debug, Clone, Copy, Default)]
pub struct Kraken;

impl ExchangeAdapter for Kraken {
    fn id(&self) -> &str {
        "KRK"
    }

    fn name(&self) -> &str {
        "Kraken"
    }

    fn url_for(&self, from: &str, to: &str) -> String {
        format!("https://api.kraken.com/0/public/Trades?pair={from}{to}&count=1")
    }

    fn extract(&self, response: &Value) -> Result<RawTrade> {
        if let Some(errors) = response.get("error").and_then(Value::as_array) {
            if let Some(first) = errors.first() {
                bail!("Kraken: {first}");
            }
        }

        let result = response
            .get("result")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("Kraken: missing result"))?;
        let trades = result
            .iter()
            .find(|(key, value)| key.as_str() != "last" && value.is_array())
            .map(|(_, value)| value)
            .ok_or_else(|| anyhow!("Kraken: no trade list"))?;

        let price = number_at(trades, "/0/0")?;
        let time = trades
            .pointer("/0/2")
            .ok_or_else(|| anyhow!("Kraken: missing trade time"))?;

        Ok(RawTrade {
            price,
            timestamp_ms: timestamp_ms(time, TimeFormat::Seconds)?,
        })
    }
}
