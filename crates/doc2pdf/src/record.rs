//! Conversion history.
//!
//! The dispatcher never writes records itself; callers hand a
//! [`RecordStore`] around explicitly and insert a record after each
//! successful conversion.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Format;

/// One successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub file_name: String,
    pub file_type: Format,
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// A record stamped with the current time.
    pub fn now(file_name: impl Into<String>, file_type: Format) -> Self {
        Self {
            file_name: file_name.into(),
            file_type,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Persistent list of conversion records.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: &ConversionRecord) -> Result<(), StoreError>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<ConversionRecord>, StoreError>;
}

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ConversionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: &ConversionRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .push(record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ConversionRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .clone())
    }
}
