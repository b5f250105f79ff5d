// src/history/mod.rs

use crate::error::StoreError;
use crate::process::NormalizedRecord;

pub mod arrow;
pub mod memory;
pub mod parquet_store;

pub use memory::MemoryStore;
pub use parquet_store::ParquetStore;

/// The durable, append-only collection of every committed year.
pub trait HistoricalStore {
    /// Whether the store has been created yet.
    fn exists(&self) -> bool;

    /// Latest year whose records are fully committed.
    fn max_committed_marker(&self) -> Result<Option<i32>, StoreError>;

    /// Commit every record of `year` as one unit: afterwards either all of
    /// them are visible or none are.
    fn append(&mut self, year: i32, records: &[NormalizedRecord]) -> Result<(), StoreError>;
}

/// Appends must extend the committed range by exactly one year.
pub(crate) fn check_next(max: Option<i32>, year: i32) -> Result<(), StoreError> {
    match max {
        Some(m) if year <= m => Err(StoreError::AlreadyCommitted(year)),
        Some(m) if year != m + 1 => Err(StoreError::OutOfOrder {
            expected: m + 1,
            got: year,
        }),
        _ => Ok(()),
    }
}
