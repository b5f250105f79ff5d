use anyhow::{Context, Result};
use arrow::array::{Array, StringArray};
use clap::Parser;
use serde::Serialize;
use sodscraper::history::{arrow::SOURCE_COLUMN, HistoricalStore, ParquetStore};
use std::{collections::BTreeSet, path::PathBuf};

#[derive(Parser)]
#[command(name = "inspect_store")]
#[command(about = "Summarize the years committed to a store directory")]
struct Args {
    /// Store directory
    #[arg(default_value = "bank_info")]
    store_dir: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct YearSummary {
    year: i32,
    rows: usize,
    source_tables: Vec<String>,
    columns: Vec<String>,
}

fn summarize(store: &ParquetStore, year: i32) -> Result<YearSummary> {
    let batches = store
        .read_year(year)
        .with_context(|| format!("reading year {}", year))?;

    let mut tables = BTreeSet::new();
    let mut columns = Vec::new();
    let mut rows = 0;
    for batch in &batches {
        rows += batch.num_rows();
        if columns.is_empty() {
            columns = batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }
        if let Some(arr) = batch
            .column_by_name(SOURCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        {
            for i in 0..arr.len() {
                if arr.is_valid(i) {
                    tables.insert(arr.value(i).to_string());
                }
            }
        }
    }

    Ok(YearSummary {
        year,
        rows,
        source_tables: tables.into_iter().collect(),
        columns,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    let store = ParquetStore::open(&args.store_dir)?;
    if !store.exists() {
        anyhow::bail!("no store at {}", args.store_dir.display());
    }

    let summaries = store
        .committed_years()?
        .into_iter()
        .map(|year| summarize(&store, year))
        .collect::<Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("=== Store: {} ===", store.root().display());
    println!("Committed years:      {}", summaries.len());
    if let Some(max) = store.max_committed_marker()? {
        println!("Latest year:          {}", max);
    }
    println!();
    for s in &summaries {
        println!("{}  {:>8} rows  tables: {}", s.year, s.rows, s.source_tables.join(", "));
    }
    if let Some(last) = summaries.last() {
        println!();
        println!("=== Columns ({}) ===", last.year);
        for c in &last.columns {
            println!("- {}", c);
        }
    }
    Ok(())
}
