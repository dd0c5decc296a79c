use thiserror::Error;

/// Rule violations raised while checking a market table, plus domain
/// construction failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'price' has nulls ({count} of {total} rows)")]
    PriceHasNulls { count: usize, total: usize },
    #[error("'price' must be > 10,000 ({count} rows at or below, first {first})")]
    PriceNotAboveFloor { count: usize, first: f64 },

    #[error("'market_cap' has nulls ({count} of {total} rows)")]
    MarketCapHasNulls { count: usize, total: usize },
    #[error("'market_cap' must be > 0 ({count} rows at or below, first {first})")]
    MarketCapNotPositive { count: usize, first: f64 },

    #[error("'volume' has nulls ({count} of {total} rows)")]
    VolumeHasNulls { count: usize, total: usize },

    #[error("'date' must be unique (duplicate {date})")]
    DuplicateDate { date: String },

    #[error("invalid date '{value}'")]
    InvalidDate { value: String },
    #[error("invalid validation profile '{value}', expected one of assertions, schema")]
    InvalidProfile { value: String },
}

impl ValidationError {
    /// Column the violated rule applies to.
    pub const fn column(&self) -> Option<&'static str> {
        match self {
            Self::PriceHasNulls { .. } | Self::PriceNotAboveFloor { .. } => Some("price"),
            Self::MarketCapHasNulls { .. } | Self::MarketCapNotPositive { .. } => {
                Some("market_cap")
            }
            Self::VolumeHasNulls { .. } => Some("volume"),
            Self::DuplicateDate { .. } | Self::InvalidDate { .. } => Some("date"),
            Self::InvalidProfile { .. } => None,
        }
    }
}
