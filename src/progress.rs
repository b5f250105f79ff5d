// src/progress.rs

use chrono::{Datelike, Local, NaiveDate};
use tracing::debug;

use crate::error::StoreError;
use crate::history::HistoricalStore;

/// Source of "today", injected so the planned range can be pinned in tests.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// The machine's local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A pinned date for tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl FixedClock {
    /// Any day inside `year`.
    pub fn in_year(year: i32) -> Self {
        Self(NaiveDate::from_ymd_opt(year, 6, 30).unwrap())
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Works out which years still have to be loaded.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    default_start: i32,
}

impl ProgressTracker {
    pub fn new(default_start: i32) -> Self {
        Self { default_start }
    }

    pub fn default_start(&self) -> i32 {
        self.default_start
    }

    /// Years after the last committed one (or from the default start when
    /// nothing is committed) up to, but excluding, the current year, whose
    /// archive is not final yet.
    pub fn next_range<H, C>(&self, store: &H, clock: &C) -> Result<Vec<i32>, StoreError>
    where
        H: HistoricalStore + ?Sized,
        C: Clock + ?Sized,
    {
        let last = if store.exists() {
            store.max_committed_marker()?
        } else {
            None
        };
        let start = last.map_or(self.default_start, |y| y + 1);
        let end = clock.today().year() - 1;
        debug!(?last, start, end, "planned range");
        Ok((start..=end).collect())
    }
}
