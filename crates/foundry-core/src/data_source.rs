//! Market data source contract and request/error types.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MarketChartRequest`] | Lookback window for one fetch |
//! | [`MarketDataSource`] | Adapter trait returning a [`MarketTable`] |
//! | [`SourceError`] | Classified fetch failure |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::MarketTable;

/// Default lookback window in days.
pub const DEFAULT_DAYS: u32 = 365;

/// Fetch error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The provider answered 429.
    RateLimited,
    /// The provider answered with another non-2xx status.
    UpstreamStatus,
    /// The body was not the expected market chart payload.
    Malformed,
    /// The request was rejected before any network call.
    InvalidRequest,
}

/// Structured fetch error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transport, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn upstream_status(status: u16, body: &str) -> Self {
        Self::new(
            SourceErrorKind::UpstreamStatus,
            format!("upstream returned status {status}: {}", preview(body)),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::UpstreamStatus => "source.upstream_status",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request for a daily market chart over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketChartRequest {
    days: u32,
}

impl MarketChartRequest {
    pub fn new(days: u32) -> Result<Self, SourceError> {
        if days == 0 {
            return Err(SourceError::invalid_request(
                "market chart lookback must be at least one day",
            ));
        }
        Ok(Self { days })
    }

    pub const fn days(self) -> u32 {
        self.days
    }
}

impl Default for MarketChartRequest {
    fn default() -> Self {
        Self { days: DEFAULT_DAYS }
    }
}

/// Adapter contract for market data providers.
pub trait MarketDataSource: Send + Sync {
    /// Short provider name used in log output.
    fn name(&self) -> &'static str;

    /// Fetch the daily price, market cap and volume series as one table.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the call fails, the provider answers with
    /// a non-success status, or the payload cannot be reshaped into a table.
    /// Partial tables are never returned.
    fn market_chart<'a>(
        &'a self,
        req: MarketChartRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketTable, SourceError>> + Send + 'a>>;
}

fn preview(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_day_window_is_rejected() {
        let err = MarketChartRequest::new(0).expect_err("zero days");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(MarketChartRequest::new(30).expect("valid").days(), 30);
        assert_eq!(MarketChartRequest::default().days(), 365);
    }

    #[test]
    fn upstream_status_truncates_long_bodies() {
        let err = SourceError::upstream_status(503, &"x".repeat(1_000));
        assert!(err.message().starts_with("upstream returned status 503"));
        assert!(err.message().ends_with("..."));
        assert!(err.message().len() < 260);
        assert_eq!(err.code(), "source.upstream_status");
    }
}
