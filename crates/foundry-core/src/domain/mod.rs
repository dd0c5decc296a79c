//! Domain types for the market snapshot table.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SnapshotDate`] | UTC timestamp of a daily data point |
//! | [`MarketSnapshotRow`] | One day's price, market cap and volume |
//! | [`MarketTable`] | Ordered rows with the fixed `date, price, market_cap, volume` layout |

mod date;
mod snapshot;

pub use date::SnapshotDate;
pub use snapshot::{MarketSnapshotRow, MarketTable, COLUMNS};
