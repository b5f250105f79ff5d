// src/history/parquet_store.rs

use arrow::record_batch::RecordBatch;
use glob::{glob, Pattern};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::arrow::records_to_batch;
use super::{check_next, HistoricalStore};
use crate::error::StoreError;
use crate::process::NormalizedRecord;

/// File holding one committed year inside its `year=<YYYY>` partition.
pub const DATA_FILE: &str = "annual_info.parquet";
const STAGING_SUFFIX: &str = ".tmp";

/// Hive-style directory of Parquet files, one partition per year.
///
/// A year is committed by writing `annual_info.parquet.tmp` and renaming it
/// into place once the writer is closed and synced, so a reader either sees
/// the whole year or nothing of it.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    /// Open the store at `root` without creating it. Staging files left
    /// behind by an interrupted run are removed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { root: root.into() };
        if store.exists() {
            let removed = store.remove_stale_staging()?;
            if removed > 0 {
                warn!(removed, root = %store.root.display(), "removed stale staging files");
            }
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, year: i32) -> PathBuf {
        self.root.join(format!("year={}", year))
    }

    pub fn data_path(&self, year: i32) -> PathBuf {
        self.partition_dir(year).join(DATA_FILE)
    }

    fn pattern(&self, tail: &str) -> String {
        format!("{}/year=*/{}", Pattern::escape(&self.root.to_string_lossy()), tail)
    }

    fn remove_stale_staging(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for path in glob(&self.pattern(&format!("*{}", STAGING_SUFFIX)))?.filter_map(Result::ok) {
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every committed year, ascending.
    pub fn committed_years(&self) -> Result<Vec<i32>, StoreError> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut years: Vec<i32> = glob(&self.pattern(DATA_FILE))?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let part = path.parent()?.file_name()?.to_str()?.to_string();
                part.strip_prefix("year=")?.parse().ok()
            })
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    /// All batches stored for `year`.
    pub fn read_year(&self, year: i32) -> Result<Vec<RecordBatch>, StoreError> {
        let path = self.data_path(year);
        let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(1024)
            .build()?;
        Ok(reader.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn row_count(&self, year: i32) -> Result<usize, StoreError> {
        Ok(self.read_year(year)?.iter().map(RecordBatch::num_rows).sum())
    }

    fn write_staged(&self, path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
        let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))?;
        writer.write(batch)?;
        let file = writer
            .into_inner()?
            .into_inner()
            .map_err(|e| StoreError::io(path, e.into_error()))?;
        file.sync_all().map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }
}

impl HistoricalStore for ParquetStore {
    fn exists(&self) -> bool {
        self.root.is_dir()
    }

    fn max_committed_marker(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.committed_years()?.last().copied())
    }

    fn append(&mut self, year: i32, records: &[NormalizedRecord]) -> Result<(), StoreError> {
        check_next(self.max_committed_marker()?, year)?;

        let batch = records_to_batch(records)?;
        let dir = self.partition_dir(year);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let final_path = dir.join(DATA_FILE);
        let staged = dir.join(format!("{}{}", DATA_FILE, STAGING_SUFFIX));
        debug!(year, path = %staged.display(), rows = batch.num_rows(), "staging");

        let result = self.write_staged(&staged, &batch).and_then(|_| {
            fs::rename(&staged, &final_path).map_err(|e| StoreError::io(&final_path, e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&staged);
            let _ = fs::remove_dir(&dir);
            return result;
        }

        info!(year, rows = batch.num_rows(), path = %final_path.display(), "committed");
        Ok(())
    }
}
