// src/fetch/container.rs

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::LoadError;

/// One file stored inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

/// A container format the fetcher can unpack in memory.
pub trait ArchiveFormat {
    /// Every file entry, in archive order.
    fn list_entries(&self, bytes: &[u8]) -> Result<Vec<ArchiveEntry>, LoadError>;

    /// Whether an entry holds tabular data worth parsing.
    fn is_tabular(&self, name: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZipFormat;

impl ArchiveFormat for ZipFormat {
    fn list_entries(&self, bytes: &[u8]) -> Result<Vec<ArchiveEntry>, LoadError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| LoadError::archive_format(format!("not a zip archive: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| {
                LoadError::archive_format(format!("cannot access entry #{}: {}", i, e))
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut content)
                .map_err(|e| LoadError::archive_format(format!("cannot read {}: {}", name, e)))?;
            entries.push(ArchiveEntry { name, content });
        }
        Ok(entries)
    }

    /// `.csv` entries, minus the AppleDouble copies macOS zips carry
    /// (`__MACOSX/` and `._` prefixed names).
    fn is_tabular(&self, name: &str) -> bool {
        let file = name.rsplit('/').next().unwrap_or(name);
        !name.starts_with("__MACOSX/")
            && !file.starts_with("._")
            && file.to_lowercase().ends_with(".csv")
    }
}
