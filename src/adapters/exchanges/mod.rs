//! Exchange Adapters - Supported Venues
//!
//! Thirteen spot exchanges. All but Kraken are described by a
//! `TradeEndpoint`; the registry is built once at startup and
//! optionally narrowed by `exchanges.enabled` in the config.

pub mod endpoint;
pub mod kraken;

use std::sync::Arc;

use tracing::info;

pub use endpoint::{SymbolStyle, TimeFormat, TradeEndpoint};
pub use kraken::Kraken;

use crate::ports::exchange::{ExchangeAdapter, ExchangeRegistry};

/// Every venue described by a plain last-trade endpoint.
pub fn trade_endpoints() -> Vec<TradeEndpoint> {
    use SymbolStyle::{Bitfinex, Concat, Dash, Lowercase, Underscore};
    use TimeFormat::{Millis, Rfc3339, Seconds};

    vec![
        TradeEndpoint {
            id: "BNU",
            name: "Binance US",
            url_template: "https://api.binance.us/api/v3/trades?symbol={symbol}&limit=1",
            symbol: Concat,
            price_pointer: "/0/price",
            time_pointer: "/0/time",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "BNC",
            name: "Binance",
            url_template: "https://api.binance.com/api/v3/trades?symbol={symbol}&limit=1",
            symbol: Concat,
            price_pointer: "/0/price",
            time_pointer: "/0/time",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "CBP",
            name: "Coinbase",
            url_template: "https://api.pro.coinbase.com/products/{symbol}/trades?limit=1",
            symbol: Dash,
            price_pointer: "/0/price",
            time_pointer: "/0/time",
            time_format: Rfc3339,
        },
        TradeEndpoint {
            id: "BFX",
            name: "Bitfinex",
            url_template: "https://api-pub.bitfinex.com/v2/trades/t{symbol}/hist?limit=1&sort=-1",
            symbol: Bitfinex,
            price_pointer: "/0/3",
            time_pointer: "/0/1",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "BYB",
            name: "Bybit",
            url_template: "https://api.bybit.com/v5/market/recent-trade?category=spot&symbol={symbol}&limit=1",
            symbol: Concat,
            price_pointer: "/result/list/0/price",
            time_pointer: "/result/list/0/time",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "GEM",
            name: "Gemini",
            url_template: "https://api.gemini.com/v1/trades/{symbol}?limit_trades=1",
            symbol: Concat,
            price_pointer: "/0/price",
            time_pointer: "/0/timestampms",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "KUC",
            name: "Kucoin",
            url_template: "https://api.kucoin.com/api/v1/market/orderbook/level1?symbol={symbol}",
            symbol: Dash,
            price_pointer: "/data/price",
            time_pointer: "/data/time",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "GIO",
            name: "Gate IO",
            url_template: "https://api.gateio.ws/api/v4/spot/trades/?currency_pair={symbol}&limit=1",
            symbol: Underscore,
            price_pointer: "/0/price",
            time_pointer: "/0/create_time",
            time_format: Seconds,
        },
        TradeEndpoint {
            id: "CRY",
            name: "Crypto.com",
            url_template: "https://api.crypto.com/exchange/v1/public/get-trades?instrument_name={symbol}&count=1",
            symbol: Underscore,
            price_pointer: "/result/data/0/p",
            time_pointer: "/result/data/0/t",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "HTX",
            name: "HTX",
            url_template: "https://api.huobi.pro/market/trade?symbol={symbol}",
            symbol: Lowercase,
            price_pointer: "/tick/data/0/price",
            time_pointer: "/tick/data/0/ts",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "MEXC",
            name: "MEXC",
            url_template: "https://api.mexc.com/api/v3/trades?symbol={symbol}&limit=1",
            symbol: Concat,
            price_pointer: "/0/price",
            time_pointer: "/0/time",
            time_format: Millis,
        },
        TradeEndpoint {
            id: "WBIT",
            name: "Whitebit",
            url_template: "https://whitebit.com/api/v4/public/trades/{symbol}",
            symbol: Underscore,
            price_pointer: "/0/price",
            time_pointer: "/0/trade_timestamp",
            time_format: Seconds,
        },
    ]
}

/// Registry of every supported exchange, restricted to `enabled`
/// unless it is empty.
pub fn default_registry(enabled: &[String]) -> ExchangeRegistry {
    let mut adapters: Vec<Arc<dyn ExchangeAdapter>> = trade_endpoints()
        .into_iter()
        .map(|e| Arc::new(e) as Arc<dyn ExchangeAdapter>)
        .collect();
    adapters.push(Arc::new(Kraken));

    let registry = ExchangeRegistry::new(adapters);
    let registry = if enabled.is_empty() {
        registry
    } else {
        registry.restrict(enabled)
    };

    info!(exchanges = ?registry.ids(), "Exchange registry built");
    registry
}
