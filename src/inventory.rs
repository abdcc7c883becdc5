//! Inventory of files already present on disk.
//!
//! Each source path contributes [`LocalFile`] records whose relative paths use
//! the same forward-slash form as archive entry names, so the two can be
//! matched by string equality:
//!
//! - a regular file contributes its base name only (`/tmp/x/a.txt` -> `a.txt`)
//! - a directory contributes every regular file beneath it, relative to the
//!   directory's parent (`/tmp/x/dir` -> `dir/sub/b.txt`)
//!
//! Symlinks and special files found while walking are skipped. Existence and
//! modification time are not cached; [`LocalFile::probe`] asks the filesystem
//! each time.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SourceWalkError;

/// A file discovered under one of the source paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// What the filesystem currently says about a [`LocalFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Missing,
    Present { modified_at: DateTime<Utc> },
}

impl LocalFile {
    /// Stat the file now.
    pub async fn probe(&self) -> LocalState {
        match tokio::fs::metadata(&self.absolute_path).await {
            Ok(meta) if meta.is_file() => {
                let modified_at = match meta.modified() {
                    Ok(time) => DateTime::<Utc>::from(time),
                    Err(e) => {
                        tracing::warn!(path = %self.absolute_path.display(), error = %e, "modification time unavailable");
                        DateTime::<Utc>::UNIX_EPOCH
                    }
                };
                LocalState::Present { modified_at }
            }
            _ => LocalState::Missing,
        }
    }
}

/// Deduplicated set of local files, indexed by relative path
#[derive(Debug, Default)]
pub struct Inventory {
    files: Vec<LocalFile>,
    seen: HashSet<PathBuf>,
    by_relative: HashMap<String, usize>,
}

impl Inventory {
    pub fn files(&self) -> &[LocalFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The first recorded file with this relative path
    pub fn lookup(&self, relative_path: &str) -> Option<&LocalFile> {
        self.by_relative.get(relative_path).map(|&i| &self.files[i])
    }

    /// Add a file unless its absolute path is already present.
    ///
    /// Returns whether the file was added.
    pub fn insert(&mut self, file: LocalFile) -> bool {
        if !self.seen.insert(file.absolute_path.clone()) {
            tracing::trace!(path = %file.absolute_path.display(), "duplicate source file ignored");
            return false;
        }
        self.by_relative
            .entry(file.relative_path.clone())
            .or_insert(self.files.len());
        self.files.push(file);
        true
    }
}

/// Where the planner looks for the local copy of an archive path
#[derive(Debug, Clone, Copy)]
pub enum LocalIndex<'a> {
    /// Files gathered from explicit source paths
    Sources(&'a Inventory),
    /// The destination tree, probed one path at a time
    Destination(&'a Path),
}

impl LocalIndex<'_> {
    /// Current state of the local file matching `relative_path`.
    pub async fn state(&self, relative_path: &str) -> LocalState {
        match self {
            LocalIndex::Sources(inventory) => match inventory.lookup(relative_path) {
                Some(file) => file.probe().await,
                None => LocalState::Missing,
            },
            LocalIndex::Destination(root) => {
                let mut absolute_path = root.to_path_buf();
                absolute_path.extend(relative_path.split('/').filter(|p| !p.is_empty()));
                LocalFile {
                    relative_path: relative_path.to_string(),
                    absolute_path,
                }
                .probe()
                .await
            }
        }
    }
}

/// Result of walking a set of source paths
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub inventory: Inventory,
    pub errors: Vec<SourceWalkError>,
}

/// Walk every source path, in order, into one inventory.
///
/// Failures are collected per path and never stop the walk.
pub fn walk<P: AsRef<Path>>(paths: &[P]) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();

    for path in paths {
        let path = path.as_ref();
        if let Err(e) = walk_source(path, &mut outcome) {
            outcome.errors.push(e);
        }
    }

    tracing::debug!(
        files = outcome.inventory.len(),
        errors = outcome.errors.len(),
        "inventory built"
    );
    outcome
}

fn walk_source(path: &Path, outcome: &mut WalkOutcome) -> Result<(), SourceWalkError> {
    let walk_err = |source| SourceWalkError {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(walk_err)?;
    let abs = fs::canonicalize(path).map_err(walk_err)?;

    if meta.is_file() {
        // Bare file: the archive holds it at the top level under its own name
        let name = path
            .file_name()
            .or_else(|| abs.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        outcome.inventory.insert(LocalFile {
            relative_path: name,
            absolute_path: abs,
        });
    } else if meta.is_dir() {
        let base = abs.parent().unwrap_or(&abs).to_path_buf();
        walk_tree(&abs, &base, outcome);
    } else {
        tracing::debug!(path = %path.display(), "skipping special file");
    }

    Ok(())
}

/// Record every regular file under `root`, relative to `base`
fn walk_tree(root: &Path, base: &Path, outcome: &mut WalkOutcome) {
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                outcome.errors.push(SourceWalkError {
                    path,
                    source: e.into(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(base) else {
            continue;
        };

        outcome.inventory.insert(LocalFile {
            relative_path: to_archive_path(relative),
            absolute_path: entry.path().to_path_buf(),
        });
    }
}

/// Render a relative filesystem path with `/` separators
pub fn to_archive_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
