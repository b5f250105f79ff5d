// src/history/memory.rs

use std::collections::BTreeMap;

use super::{check_next, HistoricalStore};
use crate::error::StoreError;
use crate::process::NormalizedRecord;

/// Store kept entirely in memory. Handy for embedding and for exercising the
/// pipeline without touching disk; it can also be told to reject one year.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    created: bool,
    years: BTreeMap<i32, Vec<NormalizedRecord>>,
    reject_year: Option<i32>,
}

impl MemoryStore {
    /// A store that does not exist yet; the first append creates it.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A store that exists but holds no years.
    pub fn empty() -> Self {
        Self {
            created: true,
            ..Self::default()
        }
    }

    /// Make the append of `year` fail without keeping any of its records.
    pub fn rejecting(mut self, year: i32) -> Self {
        self.reject_year = Some(year);
        self
    }

    pub fn records(&self, year: i32) -> Option<&[NormalizedRecord]> {
        self.years.get(&year).map(Vec::as_slice)
    }

    pub fn committed_years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    pub fn total_records(&self) -> usize {
        self.years.values().map(Vec::len).sum()
    }
}

impl HistoricalStore for MemoryStore {
    fn exists(&self) -> bool {
        self.created
    }

    fn max_committed_marker(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.years.keys().next_back().copied())
    }

    fn append(&mut self, year: i32, records: &[NormalizedRecord]) -> Result<(), StoreError> {
        check_next(self.max_committed_marker()?, year)?;
        if self.reject_year == Some(year) {
            return Err(StoreError::Rejected(format!(
                "simulated failure while writing {}",
                year
            )));
        }
        self.created = true;
        self.years.insert(year, records.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_existence_and_max() {
        let mut store = MemoryStore::absent();
        assert!(!store.exists());
        store.append(2015, &[]).unwrap();
        store.append(2016, &[]).unwrap();
        assert!(store.exists());
        assert_eq!(store.max_committed_marker().unwrap(), Some(2016));
        assert_eq!(store.committed_years(), vec![2015, 2016]);

        assert!(MemoryStore::empty().exists());
    }

    #[test]
    fn rejected_year_keeps_nothing() {
        let mut store = MemoryStore::empty().rejecting(2016);
        store.append(2015, &[]).unwrap();
        assert!(store.append(2016, &[]).is_err());
        assert_eq!(store.max_committed_marker().unwrap(), Some(2015));
        assert!(store.records(2016).is_none());
    }
}
