// src/pipeline.rs

use std::collections::BTreeMap;
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument, warn};

use crate::config::FetchConfig;
use crate::error::{LoadError, RunFailure, StoreError};
use crate::fetch::{ArchiveFetcher, ArchiveFormat, ArchiveSource, ZipFormat};
use crate::history::HistoricalStore;
use crate::process::{aggregate, RawTable};
use crate::progress::{Clock, ProgressTracker};

/// Drives fetch → aggregate → commit for every pending year, strictly in
/// order. The first failure stops the run; years committed before it stay.
pub struct Pipeline<S, H, C, F = ZipFormat> {
    fetcher: ArchiveFetcher<S, F>,
    store: H,
    tracker: ProgressTracker,
    clock: C,
    retry: FetchConfig,
}

impl<S, H, C, F> Pipeline<S, H, C, F>
where
    S: ArchiveSource,
    H: HistoricalStore,
    C: Clock,
    F: ArchiveFormat,
{
    pub fn new(fetcher: ArchiveFetcher<S, F>, store: H, tracker: ProgressTracker, clock: C) -> Self {
        Self {
            fetcher,
            store,
            tracker,
            clock,
            retry: FetchConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: FetchConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &H {
        &self.store
    }

    pub fn into_store(self) -> H {
        self.store
    }

    /// Years the next `run` would load.
    pub fn planned_range(&self) -> Result<Vec<i32>, StoreError> {
        self.tracker.next_range(&self.store, &self.clock)
    }

    /// Load every pending year. Returns how many years were committed.
    pub async fn run(&mut self) -> Result<usize, RunFailure> {
        let range = self.planned_range().map_err(|e| RunFailure {
            committed: 0,
            year: None,
            source: e.into(),
        })?;

        let (first, last) = match (range.first(), range.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                info!("store is up to date; nothing to load");
                return Ok(0);
            }
        };
        info!(first, last, years = range.len(), "starting load");

        let mut committed = 0;
        for year in range {
            let start = Instant::now();
            match self.load_year(year).await {
                Ok(records) => {
                    committed += 1;
                    info!(year, records, elapsed = ?start.elapsed(), "year loaded");
                }
                Err(source) => {
                    error!(year, committed, error = %source, "load failed; stopping run");
                    return Err(RunFailure {
                        committed,
                        year: Some(year),
                        source,
                    });
                }
            }
        }

        info!(committed, "all pending years loaded");
        Ok(committed)
    }

    #[instrument(level = "info", skip(self))]
    async fn load_year(&mut self, year: i32) -> Result<usize, LoadError> {
        let tables = self.fetch_with_retry(year).await?;
        let records = aggregate(year, &tables)?;
        drop(tables);
        self.store.append(year, &records)?;
        Ok(records.len())
    }

    async fn fetch_with_retry(&self, year: i32) -> Result<BTreeMap<String, RawTable>, LoadError> {
        let mut attempts = 0;
        loop {
            match self.fetcher.fetch(year).await {
                Ok(tables) => return Ok(tables),
                Err(e) if e.is_transient() && attempts < self.retry.max_retries => {
                    attempts += 1;
                    let delay = self.retry.backoff(attempts);
                    warn!(year, attempt = attempts, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
