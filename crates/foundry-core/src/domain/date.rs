use std::fmt::{Display, Formatter};

use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, Time};

use crate::ValidationError;

/// UTC timestamp of one daily snapshot.
///
/// Built from the provider's millisecond epoch value and kept at that
/// precision, so the trailing intraday point the provider appends to a daily
/// series stays distinct from the same day's midnight point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotDate(OffsetDateTime);

impl SnapshotDate {
    pub fn from_epoch_ms(ts_ms: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: format!("{ts_ms}ms"),
            })
    }

    /// Parse either an RFC3339 UTC timestamp or a plain `YYYY-MM-DD` day
    /// (taken as midnight UTC).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        if let Ok(parsed) = OffsetDateTime::parse(input, &Rfc3339) {
            return Ok(Self(parsed.to_offset(time::UtcOffset::UTC)));
        }

        let mut parts = input.splitn(3, '-');
        let year = parts.next().and_then(|part| part.parse::<i32>().ok());
        let month = parts.next().and_then(|part| part.parse::<u8>().ok());
        let day = parts.next().and_then(|part| part.parse::<u8>().ok());
        let (Some(year), Some(month), Some(day)) = (year, month, day) else {
            return Err(invalid());
        };

        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
        Ok(Self(date.with_time(Time::MIDNIGHT).assume_utc()))
    }

    pub fn epoch_ms(self) -> i64 {
        // In range by construction: every value started life as an i64 of ms.
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| format!("{}ms", self.epoch_ms()))
    }
}

impl Display for SnapshotDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}
