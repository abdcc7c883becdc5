//! The two things the command line can ask for: a listing, or a synchronization
//! of the archive onto a directory tree.

use std::path::Path;

use crate::config::ExtractConfig;
use crate::error::{ArchiveError, SourceWalkError, SyncError};
use crate::extract::{self, ExtractionReport};
use crate::inventory::{self, LocalIndex, WalkOutcome};
use crate::planner::{self, ExtractionDecision};
use crate::report;
use crate::zip::ArchiveCatalog;

/// Result of a completed synchronization
#[derive(Debug)]
pub struct SyncOutcome {
    pub report: ExtractionReport,
    /// Source paths that could not be walked; non-fatal
    pub source_errors: Vec<SourceWalkError>,
}

/// Read the catalog of `archive` and render the listing table.
pub async fn list_archive(archive: &Path) -> Result<String, ArchiveError> {
    let catalog = ArchiveCatalog::open(archive).await?;
    let table = report::format(catalog.entries());
    catalog.close();
    Ok(table)
}

/// Bring the destination tree in line with the archive under `config.policy`.
///
/// The catalog is read in full first, then each entry is matched against the
/// local files: those walked from `config.sources` when given, otherwise the
/// destination tree itself.
pub async fn synchronize(config: &ExtractConfig) -> Result<SyncOutcome, SyncError> {
    synchronize_with(config, |_| {}).await
}

/// [`synchronize`], calling `on_write` before each entry is written.
pub async fn synchronize_with<F>(
    config: &ExtractConfig,
    on_write: F,
) -> Result<SyncOutcome, SyncError>
where
    F: FnMut(&ExtractionDecision),
{
    let catalog = ArchiveCatalog::open(&config.archive).await?;

    let walked = if config.sources.is_empty() {
        WalkOutcome::default()
    } else {
        let walked = inventory::walk(&config.sources);
        if walked.inventory.is_empty() {
            return Err(SyncError::NoValidSources {
                errors: walked.errors,
            });
        }
        walked
    };

    let local = if config.sources.is_empty() {
        LocalIndex::Destination(&config.destination)
    } else {
        LocalIndex::Sources(&walked.inventory)
    };

    let decisions =
        planner::plan(catalog.entries(), local, config.policy, &config.destination).await;

    let report = extract::apply(&decisions, &catalog, config, on_write).await?;
    catalog.close();

    Ok(SyncOutcome {
        report,
        source_errors: walked.errors,
    })
}
