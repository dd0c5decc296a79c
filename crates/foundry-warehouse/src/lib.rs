//! # Foundry Warehouse
//!
//! Persistence sinks for the DataFoundry pipeline.
//!
//! ## Overview
//!
//! Validated market snapshots are written to two independent sinks:
//!
//! - a flat CSV file with a header row ([`flat_file`])
//! - a table inside a local `DuckDB` file ([`Warehouse`])
//!
//! Neither write is transactional with the other. A failed database load
//! leaves an already written CSV file in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use foundry_warehouse::{SnapshotRecord, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), foundry_warehouse::WarehouseError> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     let rows = vec![SnapshotRecord {
//!         ts_ms: 1_704_067_200_000,
//!         price: Some(42_000.0),
//!         market_cap: Some(8.2e11),
//!         volume: Some(1.9e10),
//!     }];
//!
//!     // Drops and recreates `raw_data`.
//!     warehouse.replace_table("raw_data", &rows)?;
//!     assert_eq!(warehouse.row_count("raw_data")?, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Table Layout
//!
//! | Column | Type |
//! |--------|------|
//! | `date` | `TIMESTAMP` (UTC) |
//! | `price` | `DOUBLE` |
//! | `market_cap` | `DOUBLE` |
//! | `volume` | `DOUBLE` |

pub mod duckdb;
pub mod flat_file;

use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use thiserror::Error;
use tracing::debug;

pub use self::duckdb::AccessMode;
pub use flat_file::{read_csv, write_csv};

/// Column order shared by the CSV file and the database table.
pub const SNAPSHOT_COLUMNS: [&str; 4] = ["date", "price", "market_cap", "volume"];

const MAX_TABLE_NAME_LEN: usize = 63;

/// Errors that can occur while persisting snapshots.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Table name is not a plain SQL identifier.
    #[error("invalid table name '{0}': expected [A-Za-z_][A-Za-z0-9_]* up to 63 characters")]
    InvalidTableName(String),

    /// Persisted data could not be mapped back to snapshot records.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// One persisted market snapshot.
///
/// `ts_ms` is the provider's timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotRecord {
    pub ts_ms: i64,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("foundry.duckdb"),
        }
    }
}

/// Handle to the local `DuckDB` file.
///
/// Each operation opens a fresh connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
}

impl Warehouse {
    /// Open (creating if needed) the database file described by `config`.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let warehouse = Self { config };
        // Fail early on an unusable file rather than at load time.
        drop(warehouse.connect(AccessMode::ReadWrite)?);
        Ok(warehouse)
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    /// Drop and recreate `table_name`, then insert `rows`.
    ///
    /// The replace and all inserts run in one transaction, so a failed
    /// insert leaves the previous table untouched. Returns the number of rows
    /// inserted.
    pub fn replace_table(
        &self,
        table_name: &str,
        rows: &[SnapshotRecord],
    ) -> Result<usize, WarehouseError> {
        let table = validate_table_name(table_name)?;
        let connection = self.connect(AccessMode::ReadWrite)?;

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            // Identifier is validated above; values are always parameters.
            connection.execute_batch(&format!(
                "CREATE OR REPLACE TABLE \"{table}\" (\
                 date TIMESTAMP, price DOUBLE, market_cap DOUBLE, volume DOUBLE)"
            ))?;

            let mut statement = connection.prepare(&format!(
                "INSERT INTO \"{table}\" (date, price, market_cap, volume) \
                 VALUES (epoch_ms(CAST(? AS BIGINT)), ?, ?, ?)"
            ))?;
            for row in rows {
                let params: [&dyn ToSql; 4] =
                    [&row.ts_ms, &row.price, &row.market_cap, &row.volume];
                statement.execute(params.as_slice())?;
            }

            Ok(rows.len())
        })();

        let inserted = finalize_transaction(&connection, result)?;
        debug!(table, inserted, db = %self.db_path().display(), "table replaced");
        Ok(inserted)
    }

    /// Count the rows currently stored in `table_name`.
    pub fn row_count(&self, table_name: &str) -> Result<usize, WarehouseError> {
        let table = validate_table_name(table_name)?;
        let connection = self.connect(AccessMode::ReadOnly)?;
        let count: i64 =
            connection.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })?;
        usize::try_from(count)
            .map_err(|_| WarehouseError::InvalidData(format!("negative row count {count}")))
    }

    /// Read every row of `table_name`, ordered by date.
    pub fn read_table(&self, table_name: &str) -> Result<Vec<SnapshotRecord>, WarehouseError> {
        let table = validate_table_name(table_name)?;
        let connection = self.connect(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(&format!(
            "SELECT epoch_ms(date), price, market_cap, volume FROM \"{table}\" ORDER BY date"
        ))?;

        let rows = statement.query_map([], |row| {
            Ok(SnapshotRecord {
                ts_ms: row.get(0)?,
                price: row.get(1)?,
                market_cap: row.get(2)?,
                volume: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(WarehouseError::from)
    }

    fn connect(&self, mode: AccessMode) -> Result<Connection, WarehouseError> {
        self::duckdb::open_connection(self.db_path(), mode).map_err(WarehouseError::from)
    }
}

/// Check that `name` can be interpolated into SQL as an identifier.
pub fn validate_table_name(name: &str) -> Result<&str, WarehouseError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if valid_start && valid_rest && name.len() <= MAX_TABLE_NAME_LEN {
        Ok(name)
    } else {
        Err(WarehouseError::InvalidTableName(name.to_owned()))
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}
