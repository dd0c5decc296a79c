//! CSV sink for snapshot records.
//!
//! Files are written with a header row and the fixed column order
//! `date, price, market_cap, volume`. Dates are RFC 3339 UTC strings and
//! null values are written as empty fields.

use std::fs::{self, File};
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{SnapshotRecord, WarehouseError, SNAPSHOT_COLUMNS};

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    price: Option<f64>,
    market_cap: Option<f64>,
    volume: Option<f64>,
}

impl CsvRow {
    fn from_record(record: &SnapshotRecord) -> Result<Self, WarehouseError> {
        Ok(Self {
            date: format_epoch_ms(record.ts_ms)?,
            price: record.price,
            market_cap: record.market_cap,
            volume: record.volume,
        })
    }

    fn into_record(self, line: u64) -> Result<SnapshotRecord, WarehouseError> {
        Ok(SnapshotRecord {
            ts_ms: parse_epoch_ms(&self.date, line)?,
            price: self.price,
            market_cap: self.market_cap,
            volume: self.volume,
        })
    }
}

/// Write records to `path`, replacing any existing file.
///
/// Missing parent directories are created. Returns the number of data rows
/// written.
pub fn write_csv(path: &Path, records: &[SnapshotRecord]) -> Result<usize, WarehouseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    // Written explicitly so an empty table still produces a header row.
    writer.write_record(SNAPSHOT_COLUMNS)?;
    for record in records {
        writer.serialize(CsvRow::from_record(record)?)?;
    }

    writer.flush()?;
    Ok(records.len())
}

/// Read records previously written by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<SnapshotRecord>, WarehouseError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(SNAPSHOT_COLUMNS.iter().copied()) {
        return Err(WarehouseError::InvalidData(format!(
            "unexpected CSV header '{}', expected '{}'",
            headers.iter().collect::<Vec<_>>().join(","),
            SNAPSHOT_COLUMNS.join(",")
        )));
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        // Header is line 1, so the first data row is line 2.
        let line = records.len() as u64 + 2;
        records.push(row.into_record(line)?);
    }
    Ok(records)
}

fn format_epoch_ms(ts_ms: i64) -> Result<String, WarehouseError> {
    let nanos = i128::from(ts_ms) * 1_000_000;
    let value = OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| {
        WarehouseError::InvalidData(format!("timestamp {ts_ms}ms is out of range"))
    })?;
    value
        .format(&Rfc3339)
        .map_err(|error| WarehouseError::InvalidData(error.to_string()))
}

fn parse_epoch_ms(value: &str, line: u64) -> Result<i64, WarehouseError> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339).map_err(|_| {
        WarehouseError::InvalidData(format!(
            "line {line}: date '{value}' is not an RFC 3339 timestamp"
        ))
    })?;
    i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).map_err(|_| {
        WarehouseError::InvalidData(format!("line {line}: date '{value}' is out of range"))
    })
}
