//! Writes validated tables to the CSV file and the `DuckDB` table.

use std::path::{Path, PathBuf};

use foundry_warehouse::{SnapshotRecord, Warehouse, WarehouseConfig, WarehouseError};
use tracing::info;

use crate::{MarketSnapshotRow, MarketTable, SnapshotDate};

impl From<&MarketSnapshotRow> for SnapshotRecord {
    fn from(row: &MarketSnapshotRow) -> Self {
        Self {
            ts_ms: row.date.epoch_ms(),
            price: row.price,
            market_cap: row.market_cap,
            volume: row.volume,
        }
    }
}

impl TryFrom<SnapshotRecord> for MarketSnapshotRow {
    type Error = WarehouseError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let date = SnapshotDate::from_epoch_ms(record.ts_ms)
            .map_err(|e| WarehouseError::InvalidData(e.to_string()))?;
        Ok(Self {
            date,
            price: record.price,
            market_cap: record.market_cap,
            volume: record.volume,
        })
    }
}

fn to_records(table: &MarketTable) -> Vec<SnapshotRecord> {
    table.rows().iter().map(SnapshotRecord::from).collect()
}

fn from_records(records: Vec<SnapshotRecord>) -> Result<MarketTable, WarehouseError> {
    records
        .into_iter()
        .map(MarketSnapshotRow::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(MarketTable::new)
}

/// Destinations for one pipeline run.
#[derive(Debug, Clone)]
pub struct Persister {
    csv_path: PathBuf,
    db_path: PathBuf,
    table_name: String,
}

impl Persister {
    pub fn new(
        csv_path: impl Into<PathBuf>,
        db_path: impl Into<PathBuf>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            csv_path: csv_path.into(),
            db_path: db_path.into(),
            table_name: table_name.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Write `table` to the CSV path, replacing the previous file.
    pub fn save_csv(&self, table: &MarketTable) -> Result<usize, WarehouseError> {
        let written = foundry_warehouse::write_csv(&self.csv_path, &to_records(table))?;
        info!("[Save] Data saved to {}", self.csv_path.display());
        Ok(written)
    }

    /// Drop and recreate the target table in the database file, then load
    /// `table` into it.
    pub fn load_duckdb(&self, table: &MarketTable) -> Result<usize, WarehouseError> {
        info!("[Load] Writing to DuckDB table: {}", self.table_name);
        let warehouse = self.open_warehouse()?;
        let inserted = warehouse.replace_table(&self.table_name, &to_records(table))?;
        info!(
            "[Load] Table `{}` created in {}",
            self.table_name,
            self.db_path.display()
        );
        Ok(inserted)
    }

    /// Read the CSV file back into a table.
    pub fn read_csv(&self) -> Result<MarketTable, WarehouseError> {
        read_csv_table(&self.csv_path)
    }

    /// Read the database table back, ordered by date.
    pub fn read_duckdb(&self) -> Result<MarketTable, WarehouseError> {
        from_records(self.open_warehouse()?.read_table(&self.table_name)?)
    }

    fn open_warehouse(&self) -> Result<Warehouse, WarehouseError> {
        Warehouse::open(WarehouseConfig {
            db_path: self.db_path.clone(),
        })
    }
}

/// Read a CSV file written by [`Persister::save_csv`].
pub fn read_csv_table(path: &Path) -> Result<MarketTable, WarehouseError> {
    from_records(foundry_warehouse::read_csv(path)?)
}
