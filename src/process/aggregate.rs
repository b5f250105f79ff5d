// src/process/aggregate.rs

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::LoadError;
use crate::process::normalize::{clean_str, normalize_date, normalize_numeric};
use crate::process::raw_table::RawTable;

/// Columns coerced to numbers, in coercion order.
pub const NUMERIC_COLUMNS: [&str; 4] = ["DEPSUM", "DEPDOM", "ASSET", "DEPSUMBR"];
/// Column coerced to a calendar date.
pub const DATE_COLUMN: &str = "SIMS_ESTABLISHED_DATE";
/// The only accepted layout of `DATE_COLUMN`.
pub const DATE_FORMAT: &str = "%m/%d/%Y";
/// Stored column holding the archive year of each row.
pub const YEAR_COLUMN: &str = "load_year";
/// Stored column holding the archive entry of each row.
pub const SOURCE_COLUMN: &str = "source_table";

/// One canonical row. Blank source cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Year of the archive the row came from.
    pub year: i32,
    /// Archive entry the row came from.
    pub source_table: String,
    pub depsum: Option<f64>,
    pub depdom: Option<f64>,
    pub asset: Option<f64>,
    pub depsumbr: Option<f64>,
    pub established: Option<NaiveDate>,
    /// Every other column, in source order.
    pub fields: Vec<(String, String)>,
}

impl NormalizedRecord {
    /// Pass-through text of `column`, if the source table had it.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric value by its source column name.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "DEPSUM" => self.depsum,
            "DEPDOM" => self.depdom,
            "ASSET" => self.asset,
            "DEPSUMBR" => self.depsumbr,
            _ => None,
        }
    }
}

/// Resolved positions of the designated columns in one table.
struct ColumnPlan {
    numeric: [usize; 4],
    date: usize,
}

/// Pass-through columns are keyed by name, so every header must be unique
/// and none may shadow a column the store adds itself.
fn check_headers(name: &str, table: &RawTable) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for header in &table.headers {
        if header == YEAR_COLUMN || header == SOURCE_COLUMN {
            return Err(LoadError::schema_mismatch(name, header, "reserved column name"));
        }
        if !seen.insert(header.as_str()) {
            return Err(LoadError::schema_mismatch(name, header, "duplicate column"));
        }
    }
    Ok(())
}

fn plan_columns(name: &str, table: &RawTable) -> Result<ColumnPlan, LoadError> {
    check_headers(name, table)?;
    let locate = |column: &str| {
        table
            .column_index(column)
            .ok_or_else(|| LoadError::schema_mismatch(name, column, "missing column"))
    };
    let mut numeric = [0usize; 4];
    for (slot, column) in numeric.iter_mut().zip(NUMERIC_COLUMNS) {
        *slot = locate(column)?;
    }
    Ok(ColumnPlan {
        numeric,
        date: locate(DATE_COLUMN)?,
    })
}

fn coerce_cell<T, E>(
    table: &str,
    row: usize,
    column: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<Option<T>, LoadError>
where
    E: Into<crate::error::MalformedValueError>,
{
    if clean_str(raw).is_empty() {
        return Ok(None);
    }
    parse(raw).map(Some).map_err(|e| LoadError::MalformedValue {
        table: table.to_string(),
        row,
        column: column.to_string(),
        source: e.into(),
    })
}

/// Concatenate every table of one year into typed records tagged with their
/// source table. Any missing designated column or bad value fails the whole
/// year; no partial output is returned.
pub fn aggregate(
    year: i32,
    tables: &BTreeMap<String, RawTable>,
) -> Result<Vec<NormalizedRecord>, LoadError> {
    // schema first, so drift is reported before any value error
    let plans = tables
        .iter()
        .map(|(name, table)| plan_columns(name, table).map(|plan| (name, table, plan)))
        .collect::<Result<Vec<_>, _>>()?;

    let total: usize = tables.values().map(RawTable::len).sum();
    let mut out = Vec::with_capacity(total);

    for (name, table, plan) in plans {
        let designated: Vec<usize> = plan
            .numeric
            .iter()
            .copied()
            .chain(std::iter::once(plan.date))
            .collect();

        for (row_idx, row) in table.rows.iter().enumerate() {
            let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

            let mut numbers = [None; 4];
            for (i, (&idx, column)) in plan.numeric.iter().zip(NUMERIC_COLUMNS).enumerate() {
                numbers[i] = coerce_cell(name, row_idx, column, cell(idx), normalize_numeric)?;
            }
            let established = coerce_cell(name, row_idx, DATE_COLUMN, cell(plan.date), |s| {
                normalize_date(s, DATE_FORMAT)
            })?;

            let fields = table
                .headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| !designated.contains(idx))
                .map(|(idx, header)| (header.clone(), cell(idx).to_string()))
                .collect();

            let [depsum, depdom, asset, depsumbr] = numbers;
            out.push(NormalizedRecord {
                year,
                source_table: name.clone(),
                depsum,
                depdom,
                asset,
                depsumbr,
                established,
                fields,
            });
        }
        debug!(year, table = %name, rows = table.len(), "aggregated table");
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    const HEADERS: &[&str] = &[
        "NAMEFULL",
        "DEPSUM",
        "DEPDOM",
        "ASSET",
        "DEPSUMBR",
        "SIMS_ESTABLISHED_DATE",
        "STALPBR",
    ];

    #[test]
    fn merges_tables_with_provenance() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "ALL_2015_1.csv".to_string(),
            table(
                HEADERS,
                &[&["First Bank", "1,000", "500", "2,000", "10", "01/01/2015", "TX"]],
            ),
        );
        tables.insert(
            "ALL_2015_2.csv".to_string(),
            table(
                HEADERS,
                &[
                    &["Caf\u{e9} Savings", "3", "4", "5", "6", "12/31/1999", "NM"],
                    &["Blank Bank", "7", "", "8", "9", "", "OK"],
                ],
            ),
        );

        let records = aggregate(2015, &tables).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.year, 2015);
        assert_eq!(first.source_table, "ALL_2015_1.csv");
        assert_eq!(first.depsum, Some(1000.0));
        assert_eq!(first.asset, Some(2000.0));
        assert_eq!(first.established, NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(first.field("NAMEFULL"), Some("First Bank"));
        assert_eq!(first.field("STALPBR"), Some("TX"));
        assert_eq!(first.field("DEPSUM"), None);

        assert_eq!(records[1].source_table, "ALL_2015_2.csv");
        assert_eq!(records[1].field("NAMEFULL"), Some("Café Savings"));
        assert_eq!(records[2].depdom, None);
        assert_eq!(records[2].established, None);
        assert_eq!(records[2].numeric("DEPSUMBR"), Some(9.0));
    }

    #[test]
    fn missing_designated_column_is_schema_mismatch() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "good.csv".to_string(),
            table(HEADERS, &[&["A", "1", "1", "1", "1", "01/01/2015", "TX"]]),
        );
        tables.insert(
            "drifted.csv".to_string(),
            table(&["DEPSUM", "DEPDOM", "ASSET", "DEPSUMBR"], &[&["1", "1", "1", "1"]]),
        );

        match aggregate(2016, &tables) {
            Err(LoadError::SchemaMismatch { table, column, .. }) => {
                assert_eq!(table, "drifted.csv");
                assert_eq!(column, DATE_COLUMN);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn repeated_header_is_schema_mismatch() {
        let mut headers = HEADERS.to_vec();
        headers.push("NAMEFULL");
        let mut tables = BTreeMap::new();
        tables.insert(
            "dup.csv".to_string(),
            table(&headers, &[&["A", "1", "1", "1", "1", "01/01/2015", "TX", "B"]]),
        );

        match aggregate(2015, &tables) {
            Err(LoadError::SchemaMismatch {
                table,
                column,
                reason,
            }) => {
                assert_eq!(table, "dup.csv");
                assert_eq!(column, "NAMEFULL");
                assert_eq!(reason, "duplicate column");
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn header_shadowing_a_stored_column_is_schema_mismatch() {
        for reserved in [YEAR_COLUMN, SOURCE_COLUMN] {
            let mut headers = HEADERS.to_vec();
            headers.push(reserved);
            let mut tables = BTreeMap::new();
            tables.insert(
                "t.csv".to_string(),
                table(&headers, &[&["A", "1", "1", "1", "1", "01/01/2015", "TX", "1999"]]),
            );
            assert!(matches!(
                aggregate(2015, &tables),
                Err(LoadError::SchemaMismatch { ref column, .. }) if column == reserved
            ));
        }
    }

    #[test]
    fn bad_value_names_its_cell() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "t.csv".to_string(),
            table(
                HEADERS,
                &[
                    &["A", "1", "1", "1", "1", "01/01/2015", "TX"],
                    &["B", "1", "n/a", "1", "1", "01/01/2015", "TX"],
                ],
            ),
        );

        match aggregate(2015, &tables) {
            Err(LoadError::MalformedValue {
                table,
                row,
                column,
                source,
            }) => {
                assert_eq!(table, "t.csv");
                assert_eq!(row, 1);
                assert_eq!(column, "DEPDOM");
                assert_eq!(source.value, "n/a");
            }
            other => panic!("expected malformed value, got {:?}", other),
        }
    }

    #[test]
    fn date_in_wrong_layout_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "t.csv".to_string(),
            table(HEADERS, &[&["A", "1", "1", "1", "1", "2015-01-01", "TX"]]),
        );
        assert!(matches!(
            aggregate(2015, &tables),
            Err(LoadError::MalformedValue { ref column, .. }) if column == DATE_COLUMN
        ));
    }
}
