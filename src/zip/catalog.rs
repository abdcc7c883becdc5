use std::path::Path;
use std::sync::Arc;

use crate::error::{ArchiveError, ExtractionError};
use crate::io::{LocalFileReader, ReadAt};

use super::extractor::ZipExtractor;
use super::structures::ArchiveEntry;

/// Sums over every record of a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogTotals {
    pub compressed: u64,
    pub uncompressed: u64,
    pub count: usize,
}

/// An opened archive together with its fully read central directory.
///
/// The archive handle stays open until the catalog is dropped or
/// [`close`](Self::close)d.
pub struct ArchiveCatalog<R: ReadAt> {
    extractor: ZipExtractor<R>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveCatalog<LocalFileReader> {
    /// Open a ZIP file on disk and read its central directory.
    pub async fn open(path: &Path) -> Result<Self, ArchiveError> {
        let reader = LocalFileReader::new(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(Arc::new(reader)).await
    }
}

impl<R: ReadAt> ArchiveCatalog<R> {
    pub async fn from_reader(reader: Arc<R>) -> Result<Self, ArchiveError> {
        let extractor = ZipExtractor::new(reader);
        let entries = extractor.parser().list_entries().await?;
        tracing::debug!(entries = entries.len(), "catalog loaded");
        Ok(Self { extractor, entries })
    }

    /// Every record in archive order, duplicates included
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn totals(&self) -> CatalogTotals {
        totals(&self.entries)
    }

    pub async fn extract_to_file(
        &self,
        entry: &ArchiveEntry,
        output_path: &Path,
    ) -> Result<u64, ExtractionError> {
        self.extractor.extract_to_file(entry, output_path).await
    }

    pub async fn extract_to_memory(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, ExtractionError> {
        self.extractor.extract_to_memory(entry).await
    }

    /// Release the archive handle, keeping the entry records
    pub fn close(self) -> Vec<ArchiveEntry> {
        self.entries
    }
}

/// Sum compressed and uncompressed sizes over `entries`
pub fn totals(entries: &[ArchiveEntry]) -> CatalogTotals {
    entries.iter().fold(CatalogTotals::default(), |acc, e| CatalogTotals {
        compressed: acc.compressed + e.compressed_size,
        uncompressed: acc.uncompressed + e.uncompressed_size,
        count: acc.count + 1,
    })
}
