//! Row- and column-level checks on a fetched [`MarketTable`].
//!
//! Rules run in a fixed order and the first violation rejects the whole
//! table. A table that passes is handed back untouched.
//!
//! | Profile | Rules |
//! |---------|-------|
//! | [`ValidationProfile::Assertions`] | price not null, price > 10,000, market_cap not null, volume not null, date unique |
//! | [`ValidationProfile::Schema`] | the assertion rules plus market_cap > 0 |

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use tracing::{error, info};

use crate::{MarketTable, ValidationError};

/// Every price must be strictly above this value.
pub const PRICE_FLOOR: f64 = 10_000.0;

/// A single table check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    PriceNotNull,
    PriceAboveFloor,
    MarketCapNotNull,
    MarketCapPositive,
    VolumeNotNull,
    DateUnique,
}

impl Rule {
    pub fn check(self, table: &MarketTable) -> Result<(), ValidationError> {
        let total = table.len();
        match self {
            Self::PriceNotNull => {
                let count = table.prices().filter(Option::is_none).count();
                if count > 0 {
                    return Err(ValidationError::PriceHasNulls { count, total });
                }
            }
            Self::PriceAboveFloor => {
                if let Some((count, first)) = violations(table.prices(), |p| p > PRICE_FLOOR) {
                    return Err(ValidationError::PriceNotAboveFloor { count, first });
                }
            }
            Self::MarketCapNotNull => {
                let count = table.market_caps().filter(Option::is_none).count();
                if count > 0 {
                    return Err(ValidationError::MarketCapHasNulls { count, total });
                }
            }
            Self::MarketCapPositive => {
                if let Some((count, first)) = violations(table.market_caps(), |m| m > 0.0) {
                    return Err(ValidationError::MarketCapNotPositive { count, first });
                }
            }
            Self::VolumeNotNull => {
                let count = table.volumes().filter(Option::is_none).count();
                if count > 0 {
                    return Err(ValidationError::VolumeHasNulls { count, total });
                }
            }
            Self::DateUnique => {
                let mut seen = HashSet::with_capacity(total);
                if let Some(date) = table.dates().find(|date| !seen.insert(*date)) {
                    return Err(ValidationError::DuplicateDate {
                        date: date.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Count non-null values failing `passes`, with the first offender.
fn violations(
    values: impl Iterator<Item = Option<f64>>,
    passes: impl Fn(f64) -> bool,
) -> Option<(usize, f64)> {
    let mut failing = values.flatten().filter(|value| !passes(*value));
    let first = failing.next()?;
    Some((1 + failing.count(), first))
}

/// Named rule set applied by [`validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationProfile {
    /// The five assertion checks the pipeline has always run.
    #[default]
    Assertions,
    /// Assertion checks plus a strictly positive market cap.
    Schema,
}

impl ValidationProfile {
    pub const fn rules(self) -> &'static [Rule] {
        match self {
            Self::Assertions => &[
                Rule::PriceNotNull,
                Rule::PriceAboveFloor,
                Rule::MarketCapNotNull,
                Rule::VolumeNotNull,
                Rule::DateUnique,
            ],
            Self::Schema => &[
                Rule::PriceNotNull,
                Rule::PriceAboveFloor,
                Rule::MarketCapNotNull,
                Rule::MarketCapPositive,
                Rule::VolumeNotNull,
                Rule::DateUnique,
            ],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assertions => "assertions",
            Self::Schema => "schema",
        }
    }
}

impl Display for ValidationProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationProfile {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assertions" => Ok(Self::Assertions),
            "schema" => Ok(Self::Schema),
            _ => Err(ValidationError::InvalidProfile {
                value: value.to_owned(),
            }),
        }
    }
}

/// Run every rule of `profile` against `table`, returning it unchanged on
/// success.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in rule order.
pub fn validate(
    table: MarketTable,
    profile: ValidationProfile,
) -> Result<MarketTable, ValidationError> {
    for rule in profile.rules() {
        if let Err(violation) = rule.check(&table) {
            error!("❌ Validation failed ({profile}): {violation}");
            return Err(violation);
        }
    }

    info!("✅ All {profile} checks passed on {} rows.", table.len());
    Ok(table)
}
