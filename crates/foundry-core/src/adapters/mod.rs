//! Market data provider adapters.

pub mod coingecko;

pub use coingecko::{parse_market_chart, CoinGeckoAdapter};
