//! `DuckDB` connection handling.
//!
//! Every warehouse operation opens its own connection and drops it before
//! returning. Loads use a read-write connection; verification reads open the
//! file with `access_mode = READ_ONLY` so they cannot modify it.

use std::path::Path;

use ::duckdb::{Config, Connection};

/// How a connection may touch the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads only. The file must already exist.
    ReadOnly,
    /// Reads and writes. Creates the file if missing.
    ReadWrite,
}

impl AccessMode {
    fn config(self) -> Result<Config, ::duckdb::Error> {
        let access = match self {
            Self::ReadOnly => ::duckdb::AccessMode::ReadOnly,
            Self::ReadWrite => ::duckdb::AccessMode::ReadWrite,
        };
        Config::default().access_mode(access)
    }
}

/// Open `path` with the access rights of `mode`.
pub fn open_connection(path: &Path, mode: AccessMode) -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open_with_flags(path, mode.config()?)?;
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_only_connection_rejects_writes() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("foundry.duckdb");
        {
            let writer = open_connection(&path, AccessMode::ReadWrite).expect("create");
            writer
                .execute_batch(
                    "CREATE TABLE raw_data (price DOUBLE); INSERT INTO raw_data VALUES (1.0);",
                )
                .expect("seed");
        }

        let reader = open_connection(&path, AccessMode::ReadOnly).expect("open read-only");

        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM raw_data", [], |row| row.get(0))
            .expect("reads are allowed");
        assert_eq!(count, 1);
        assert!(reader.execute_batch("INSERT INTO raw_data VALUES (2.0);").is_err());
        assert!(reader.execute_batch("DROP TABLE raw_data;").is_err());
    }

    #[test]
    fn read_only_connection_requires_existing_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("missing.duckdb");

        assert!(open_connection(&path, AccessMode::ReadOnly).is_err());
        assert!(!path.exists());
    }
}
