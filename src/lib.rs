//! # zipfresh
//!
//! Extract ZIP archives onto a directory tree with update or freshen
//! semantics.
//!
//! A run reads the archive's central directory into an [`ArchiveCatalog`],
//! inventories the files already on disk, plans a write/skip decision for every
//! entry by comparing modification times, and then streams the chosen entries
//! into place.
//!
//! - **Update** writes entries that are missing locally or newer in the archive.
//! - **Freshen** only overwrites local files that are older than the archive
//!   copy and never creates new ones.
//!
//! ## Example
//!
//! ```no_run
//! use zipfresh::{ExtractConfig, Policy, synchronize};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExtractConfig::new("backup.zip", "restore").with_policy(Policy::Freshen);
//!     let outcome = synchronize(&config).await?;
//!     println!("{}", outcome.report.summary());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod io;
pub mod planner;
pub mod report;
pub mod sync;
pub mod zip;

pub use cli::Cli;
pub use config::{ExtractConfig, Policy, Strictness};
pub use error::{ArchiveError, ExtractionError, SourceWalkError, SyncError, UsageError};
pub use extract::ExtractionReport;
pub use inventory::{Inventory, LocalFile, LocalIndex, LocalState};
pub use io::{LocalFileReader, ReadAt};
pub use planner::{Action, ExtractionDecision, Reason};
pub use sync::{SyncOutcome, list_archive, synchronize, synchronize_with};
pub use zip::{ArchiveCatalog, ArchiveEntry};
