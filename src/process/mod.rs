// src/process/mod.rs
pub mod aggregate;
pub mod normalize;
pub mod raw_table;

pub use aggregate::{
    aggregate, NormalizedRecord, DATE_COLUMN, DATE_FORMAT, NUMERIC_COLUMNS, SOURCE_COLUMN, YEAR_COLUMN,
};
pub use normalize::{normalize_date, normalize_numeric};
pub use raw_table::RawTable;
