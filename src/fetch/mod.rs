// src/fetch/mod.rs

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::error::LoadError;
use crate::process::RawTable;

pub mod container;
pub mod csv_table;
pub mod source;

pub use container::{ArchiveEntry, ArchiveFormat, ZipFormat};
pub use csv_table::{parse_table, TextEncoding};
pub use source::{ArchiveSource, HttpArchiveSource, MirrorArchiveSource, TemplateError};

/// Turns a year into its set of raw tables: retrieve, unpack, parse.
/// Failures are returned as-is; retrying is the caller's business.
pub struct ArchiveFetcher<S, F = ZipFormat> {
    source: S,
    format: F,
    encoding: TextEncoding,
}

impl<S: ArchiveSource> ArchiveFetcher<S, ZipFormat> {
    pub fn new(source: S, encoding: TextEncoding) -> Self {
        Self::with_format(source, ZipFormat, encoding)
    }
}

impl<S: ArchiveSource, F: ArchiveFormat> ArchiveFetcher<S, F> {
    pub fn with_format(source: S, format: F, encoding: TextEncoding) -> Self {
        Self {
            source,
            format,
            encoding,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Map of archive entry name → parsed table, for every tabular entry.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, year: i32) -> Result<BTreeMap<String, RawTable>, LoadError> {
        let bytes = self.source.fetch_bytes(year).await?;
        info!(size = bytes.len(), "archive retrieved");

        let mut tables = BTreeMap::new();
        for entry in self.format.list_entries(&bytes)? {
            if !self.format.is_tabular(&entry.name) {
                debug!(entry = %entry.name, "skipping non-tabular entry");
                continue;
            }
            let table = parse_table(&entry.name, &entry.content, self.encoding)?;
            debug!(entry = %entry.name, rows = table.len(), columns = table.headers.len(), "parsed");
            tables.insert(entry.name, table);
        }

        if tables.is_empty() {
            return Err(LoadError::EmptyArchive {
                target: self.source.describe(year),
            });
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::container::tests::zip_bytes;
    use super::*;
    use std::collections::HashMap;

    /// In-memory source keyed by year; unknown years fail like a 404.
    #[derive(Default)]
    struct FakeSource {
        archives: HashMap<i32, Vec<u8>>,
    }

    impl ArchiveSource for FakeSource {
        fn describe(&self, year: i32) -> String {
            format!("fake://ALL_{}.zip", year)
        }

        async fn fetch_bytes(&self, year: i32) -> Result<Vec<u8>, LoadError> {
            self.archives
                .get(&year)
                .cloned()
                .ok_or_else(|| LoadError::retrieval(self.describe(year), "404 Not Found"))
        }
    }

    fn fetcher_with(year: i32, bytes: Vec<u8>) -> ArchiveFetcher<FakeSource> {
        let mut source = FakeSource::default();
        source.archives.insert(year, bytes);
        ArchiveFetcher::new(source, TextEncoding::Latin1)
    }

    #[tokio::test]
    async fn parses_only_tabular_entries() {
        let bytes = zip_bytes(&[
            ("ALL_2015_1.csv", b"A,B\n1,2\n3,4\n".as_slice()),
            ("Layout.txt", b"ignore me".as_slice()),
            ("ALL_2015_2.CSV", b"A\n5\n".as_slice()),
        ]);
        let tables = fetcher_with(2015, bytes).fetch(2015).await.unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables["ALL_2015_1.csv"].len(), 2);
        assert_eq!(tables["ALL_2015_2.CSV"].headers, vec!["A"]);
    }

    #[tokio::test]
    async fn macos_resource_forks_are_skipped() {
        let bytes = zip_bytes(&[
            ("ALL_2015.csv", b"A\n1\n".as_slice()),
            ("__MACOSX/._ALL_2015.csv", b"\x00\x05\x16\x07junk".as_slice()),
        ]);
        let tables = fetcher_with(2015, bytes).fetch(2015).await.unwrap();
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["ALL_2015.csv"]);
    }

    #[tokio::test]
    async fn archive_without_csv_is_empty() {
        let bytes = zip_bytes(&[("readme.txt", b"nothing here".as_slice())]);
        let err = fetcher_with(2015, bytes).fetch(2015).await.unwrap_err();
        assert!(matches!(err, LoadError::EmptyArchive { ref target } if target == "fake://ALL_2015.zip"));
    }

    #[tokio::test]
    async fn html_error_page_is_format_error() {
        let err = fetcher_with(2015, b"<html>busy</html>".to_vec())
            .fetch(2015)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::ArchiveFormat { .. }));
    }

    #[tokio::test]
    async fn missing_year_is_retrieval_error() {
        let err = fetcher_with(2015, Vec::new()).fetch(2016).await.unwrap_err();
        assert!(err.is_transient());
    }
}
