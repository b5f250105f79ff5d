// src/history/arrow.rs

use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use std::{collections::HashSet, sync::Arc};

use crate::error::StoreError;
use crate::process::{NormalizedRecord, DATE_COLUMN, NUMERIC_COLUMNS};

pub use crate::process::{SOURCE_COLUMN, YEAR_COLUMN};

/// 1970-01-01 counted from 0001-01-01 as day 1.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Date32 counts days since the Unix epoch.
pub fn to_date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn from_date32(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

/// Pass-through columns of `records`, in first-seen order.
pub fn passthrough_columns(records: &[NormalizedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for rec in records {
        for (name, _) in &rec.fields {
            if seen.insert(name.as_str()) {
                cols.push(name.clone());
            }
        }
    }
    cols
}

/// Fixed typed columns first, then every pass-through column as text.
pub fn build_schema(passthrough: &[String]) -> SchemaRef {
    let mut fields = vec![
        Field::new(YEAR_COLUMN, DataType::Int32, false),
        Field::new(SOURCE_COLUMN, DataType::Utf8, false),
    ];
    fields.extend(
        NUMERIC_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, true)),
    );
    fields.push(Field::new(DATE_COLUMN, DataType::Date32, true));
    fields.extend(
        passthrough
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Lay one year's records out as a single columnar batch.
pub fn records_to_batch(records: &[NormalizedRecord]) -> Result<RecordBatch, StoreError> {
    let passthrough = passthrough_columns(records);
    let schema = build_schema(&passthrough);

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.year))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.source_table.as_str()),
        )),
    ];
    for name in NUMERIC_COLUMNS {
        columns.push(Arc::new(Float64Array::from_iter(
            records.iter().map(|r| r.numeric(name)),
        )));
    }
    columns.push(Arc::new(Date32Array::from_iter(
        records.iter().map(|r| r.established.map(to_date32)),
    )));
    for name in &passthrough {
        columns.push(Arc::new(StringArray::from_iter(
            records.iter().map(|r| r.field(name)),
        )));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}
