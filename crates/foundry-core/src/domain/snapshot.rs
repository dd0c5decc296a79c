use crate::SnapshotDate;

/// Column names of a [`MarketTable`], in order.
pub const COLUMNS: [&str; 4] = ["date", "price", "market_cap", "volume"];

/// One day's price, market capitalization and volume for the tracked asset.
///
/// Numeric fields are optional because the provider may send `null` inside a
/// series; the validator decides whether that is acceptable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSnapshotRow {
    pub date: SnapshotDate,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
}

impl MarketSnapshotRow {
    pub fn new(date: SnapshotDate, price: f64, market_cap: f64, volume: f64) -> Self {
        Self {
            date,
            price: Some(price),
            market_cap: Some(market_cap),
            volume: Some(volume),
        }
    }
}

/// Ordered set of market snapshot rows with the fixed [`COLUMNS`] layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketTable {
    rows: Vec<MarketSnapshotRow>,
}

impl MarketTable {
    pub fn new(rows: Vec<MarketSnapshotRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MarketSnapshotRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MarketSnapshotRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), COLUMNS.len())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn dates(&self) -> impl Iterator<Item = SnapshotDate> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    pub fn prices(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|row| row.price)
    }

    pub fn market_caps(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|row| row.market_cap)
    }

    pub fn volumes(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|row| row.volume)
    }
}

impl FromIterator<MarketSnapshotRow> for MarketTable {
    fn from_iter<I: IntoIterator<Item = MarketSnapshotRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
