//! SQLite-backed conversion log.
//!
//! Schema:
//!   conversions(
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     file_name  TEXT NOT NULL,
//!     file_type  TEXT NOT NULL,   -- canonical extension, e.g. "md"
//!     created_at TEXT NOT NULL    -- RFC 3339
//!   )

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use doc2pdf::config::Format;
use doc2pdf::record::{ConversionRecord, RecordStore, StoreError};
use rusqlite::{Connection, params};
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS conversions (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name  TEXT NOT NULL,
    file_type  TEXT NOT NULL,
    created_at TEXT NOT NULL
);";

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        debug!(path = %path.as_ref().display(), "record store opened");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &ConversionRecord) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT INTO conversions (file_name, file_type, created_at) VALUES (?1, ?2, ?3)",
                params![
                    record.file_name,
                    record.file_type.extension(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ConversionRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT file_name, file_type, created_at FROM conversions ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (file_name, file_type, created_at) = row.map_err(db_err)?;
            let file_type = Format::from_extension(&file_type)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown file type {file_type:?}")))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Corrupt(format!("bad timestamp {created_at:?}: {e}")))?
                .with_timezone(&Utc);
            records.push(ConversionRecord {
                file_name,
                file_type,
                created_at,
            });
        }
        Ok(records)
    }
}
