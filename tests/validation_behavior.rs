//! Behavior-driven tests for table validation and the CSV snapshot
//!
//! These tests describe what a caller observes when handing a market table
//! to the validator and persisting the result.

use foundry_core::{
    read_csv_table, validate, MarketSnapshotRow, MarketTable, Persister, SnapshotDate,
    ValidationError, ValidationProfile, COLUMNS,
};
use tempfile::tempdir;

fn day(value: &str) -> SnapshotDate {
    SnapshotDate::parse(value).expect("valid day")
}

fn table(rows: &[(&str, f64, f64, f64)]) -> MarketTable {
    rows.iter()
        .map(|(date, price, market_cap, volume)| {
            MarketSnapshotRow::new(day(date), *price, *market_cap, *volume)
        })
        .collect()
}

fn two_good_days() -> MarketTable {
    table(&[
        ("2024-01-01", 15_000.0, 1e6, 5_000.0),
        ("2024-01-02", 16_000.0, 2e6, 6_000.0),
    ])
}

// =============================================================================
// Validation: Accepted Tables
// =============================================================================

#[test]
fn valid_table_passes_unchanged_with_four_columns() {
    // Given: Two days of complete data above the price floor
    let input = two_good_days();

    // When: It is validated with the default profile
    let output = validate(input.clone(), ValidationProfile::default()).expect("valid table");

    // Then: The same table comes back with shape (2, 4)
    assert_eq!(output, input);
    assert_eq!(output.shape(), (2, 4));
    assert_eq!(output.columns(), COLUMNS);
}

#[test]
fn every_profile_accepts_a_clean_table() {
    for profile in [ValidationProfile::Assertions, ValidationProfile::Schema] {
        assert!(validate(two_good_days(), profile).is_ok(), "{profile}");
    }
}

// =============================================================================
// Validation: Rejected Tables
// =============================================================================

#[test]
fn prices_below_floor_are_rejected() {
    // Given: Prices of 500 and 100
    let input = table(&[
        ("2024-01-01", 500.0, 1e6, 5_000.0),
        ("2024-01-02", 100.0, 2e6, 6_000.0),
    ]);

    // When: The table is validated
    let err = validate(input, ValidationProfile::Assertions).expect_err("too cheap");

    // Then: The price rule is named
    assert!(matches!(
        err,
        ValidationError::PriceNotAboveFloor { count: 2, first } if first == 500.0
    ));
    assert!(err.to_string().starts_with("'price' must be > 10,000"));
}

#[test]
fn a_single_low_price_is_enough_to_reject() {
    let input = table(&[
        ("2024-01-01", 15_000.0, 1e6, 5_000.0),
        ("2024-01-02", 9_999.99, 2e6, 6_000.0),
    ]);

    let err = validate(input, ValidationProfile::Assertions).expect_err("one low price");
    assert!(matches!(
        err,
        ValidationError::PriceNotAboveFloor { count: 1, .. }
    ));
}

#[test]
fn duplicate_dates_are_rejected() {
    // Given: The same day appears twice
    let input = table(&[
        ("2024-01-01", 15_000.0, 1e6, 5_000.0),
        ("2024-01-01", 16_000.0, 2e6, 6_000.0),
    ]);

    // When: The table is validated
    let err = validate(input, ValidationProfile::Assertions).expect_err("duplicate");

    // Then: The uniqueness rule is named
    assert_eq!(err.column(), Some("date"));
    assert!(matches!(err, ValidationError::DuplicateDate { .. }));
}

#[test]
fn same_day_at_different_times_is_not_a_duplicate() {
    // Given: A midnight point and an intraday point on the same calendar day
    let input: MarketTable = vec![
        MarketSnapshotRow::new(day("2024-01-01"), 15_000.0, 1e6, 5_000.0),
        MarketSnapshotRow::new(
            day("2024-01-01T14:32:10.123Z"),
            15_100.0,
            1.1e6,
            5_100.0,
        ),
    ]
    .into_iter()
    .collect();

    // Then: Both timestamps are distinct and the table passes
    assert!(validate(input, ValidationProfile::Assertions).is_ok());
}

#[test]
fn null_volume_is_rejected() {
    let mut rows = two_good_days().into_rows();
    rows[1].volume = None;

    let err = validate(MarketTable::new(rows), ValidationProfile::Assertions)
        .expect_err("missing volume");
    assert_eq!(err, ValidationError::VolumeHasNulls { count: 1, total: 2 });
}

// =============================================================================
// CSV Snapshot
// =============================================================================

#[test]
fn validated_table_survives_csv_round_trip() {
    // Given: A validated table
    let temp = tempdir().expect("tempdir");
    let csv_path = temp.path().join("data").join("input.csv");
    let validated =
        validate(two_good_days(), ValidationProfile::Assertions).expect("valid table");

    // When: It is saved and read back
    let persister = Persister::new(&csv_path, temp.path().join("foundry.duckdb"), "raw_data");
    persister.save_csv(&validated).expect("csv written");
    let restored = read_csv_table(&csv_path).expect("csv readable");

    // Then: The tables are equal
    assert_eq!(restored, validated);

    // And: The file has a header and one line per row
    let contents = std::fs::read_to_string(&csv_path).expect("csv text");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("date,price,market_cap,volume"));
    assert_eq!(lines.count(), 2);
}
