//! Carries out a plan against the destination tree.

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::config::{ExtractConfig, Strictness};
use crate::error::ExtractionError;
use crate::io::ReadAt;
use crate::planner::{Action, ExtractionDecision, Reason};
use crate::zip::{ArchiveCatalog, ArchiveEntry};

/// Suffix of the staging file an entry is decoded into before it replaces
/// the destination
const PARTIAL_SUFFIX: &str = "zipfresh-partial";

/// Outcome counts of one extraction pass
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub written: usize,
    pub skipped: usize,
    pub directories: usize,
    /// Only populated under [`Strictness::Continue`]
    pub failures: Vec<ExtractionError>,
}

impl ExtractionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "written: {}, skipped: {}, failed: {}",
            self.written,
            self.skipped,
            self.failed()
        )
    }
}

/// Execute `decisions` in order.
///
/// Directory markers create their directory; `Write` decisions stream the
/// entry into place, calling `on_write` just before each one. Under
/// [`Strictness::Abort`] the first failure is returned; under
/// [`Strictness::Continue`] failures are collected in the report.
pub async fn apply<R, F>(
    decisions: &[ExtractionDecision],
    catalog: &ArchiveCatalog<R>,
    config: &ExtractConfig,
    mut on_write: F,
) -> Result<ExtractionReport, ExtractionError>
where
    R: ReadAt,
    F: FnMut(&ExtractionDecision),
{
    let mut report = ExtractionReport::default();

    for decision in decisions {
        let entry = &catalog.entries()[decision.entry_index];

        let result = match (decision.action, decision.reason) {
            (Action::Skip, Reason::IsDirectoryMarker) => {
                create_directory(&config.destination, entry).await.map(|()| {
                    report.directories += 1;
                })
            }
            (Action::Skip, reason) => {
                tracing::debug!(path = %entry.path, %reason, "skipped");
                report.skipped += 1;
                Ok(())
            }
            (Action::Write, _) => {
                on_write(decision);
                write_entry(catalog, entry, &config.destination)
                    .await
                    .map(|()| {
                        report.written += 1;
                    })
            }
        };

        if let Err(e) = result {
            match config.strictness {
                Strictness::Abort => return Err(e),
                Strictness::Continue => {
                    tracing::warn!(error = %e, "entry failed, continuing");
                    report.failures.push(e);
                }
            }
        }
    }

    Ok(report)
}

/// Normalize an archive name to the `/`-separated path it occupies below the
/// destination root.
///
/// `.` segments are dropped and `..` segments resolved lexically. Returns
/// `None` for a name that is absolute or that would climb above the root.
pub fn normalize_entry_path(archive_path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(archive_path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

/// Map an archive name onto the destination tree.
///
/// Same rules as [`normalize_entry_path`]; a rejected name becomes
/// [`ExtractionError::UnsafePath`].
pub fn resolve_destination(root: &Path, archive_path: &str) -> Result<PathBuf, ExtractionError> {
    let relative = normalize_entry_path(archive_path).ok_or_else(|| unsafe_path(archive_path))?;
    let mut resolved = root.to_path_buf();
    resolved.extend(relative.split('/').filter(|p| !p.is_empty()));
    Ok(resolved)
}

fn unsafe_path(entry: &str) -> ExtractionError {
    ExtractionError::UnsafePath {
        entry: entry.to_string(),
    }
}

fn io_error(entry: &str, path: &Path, source: io::Error) -> ExtractionError {
    ExtractionError::Io {
        entry: entry.to_string(),
        path: path.to_path_buf(),
        source,
    }
}

/// Create the `/`-separated directory `relative` under `root`, one level at a
/// time, and return where it really lives.
///
/// A symlink met on the way is followed only when its target stays inside
/// `root`; otherwise the entry is refused.
async fn create_contained_dir(
    root: &Path,
    relative: &str,
    entry: &str,
) -> Result<PathBuf, ExtractionError> {
    fs::create_dir_all(root)
        .await
        .map_err(|e| io_error(entry, root, e))?;
    let real_root = fs::canonicalize(root)
        .await
        .map_err(|e| io_error(entry, root, e))?;

    let mut current = real_root.clone();
    for part in relative.split('/').filter(|p| !p.is_empty()) {
        current.push(part);
        match fs::symlink_metadata(&current).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::canonicalize(&current)
                    .await
                    .map_err(|e| io_error(entry, &current, e))?;
                if !target.starts_with(&real_root) {
                    tracing::warn!(
                        path = %current.display(),
                        target = %target.display(),
                        "symlink leads outside the destination"
                    );
                    return Err(unsafe_path(entry));
                }
                current = target;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir(&current).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(io_error(entry, &current, e)),
            },
            Err(e) => return Err(io_error(entry, &current, e)),
        }
    }

    Ok(current)
}

async fn create_directory(root: &Path, entry: &ArchiveEntry) -> Result<(), ExtractionError> {
    let relative = normalize_entry_path(&entry.path).ok_or_else(|| unsafe_path(&entry.path))?;
    create_contained_dir(root, &relative, &entry.path)
        .await
        .map(|_| ())
}

async fn write_entry<R: ReadAt>(
    catalog: &ArchiveCatalog<R>,
    entry: &ArchiveEntry,
    root: &Path,
) -> Result<(), ExtractionError> {
    let relative = normalize_entry_path(&entry.path).ok_or_else(|| unsafe_path(&entry.path))?;
    let (dir, name) = relative.rsplit_once('/').unwrap_or(("", relative.as_str()));
    if name.is_empty() {
        return Err(ExtractionError::CorruptData {
            entry: entry.path.clone(),
            reason: "entry has no file name".to_string(),
        });
    }

    let parent = create_contained_dir(root, dir, &entry.path).await?;
    let path = parent.join(name);
    let partial = parent.join(format!(".{name}.{PARTIAL_SUFFIX}"));

    remove_if_present(&partial)
        .await
        .map_err(|e| io_error(&entry.path, &partial, e))?;

    // The destination is only replaced once the payload has been decoded and
    // verified; rename swaps out a symlink rather than writing through it.
    let staged = match stage_entry(catalog, entry, &partial).await {
        Ok(written) => fs::rename(&partial, &path)
            .await
            .map(|()| written)
            .map_err(|e| io_error(&entry.path, &path, e)),
        Err(e) => Err(e),
    };

    match staged {
        Ok(written) => {
            tracing::trace!(path = %path.display(), bytes = written, "written");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = remove_if_present(&partial).await {
                tracing::warn!(
                    path = %partial.display(),
                    error = %cleanup,
                    "could not remove partial file"
                );
            }
            Err(e)
        }
    }
}

/// Decode `entry` into `partial` and give it the entry's mode and mtime.
async fn stage_entry<R: ReadAt>(
    catalog: &ArchiveCatalog<R>,
    entry: &ArchiveEntry,
    partial: &Path,
) -> Result<u64, ExtractionError> {
    let written = catalog.extract_to_file(entry, partial).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = entry.permissions() {
            fs::set_permissions(partial, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| io_error(&entry.path, partial, e))?;
        }
    }

    filetime::set_file_mtime(partial, file_time(entry.modified_at))
        .map_err(|e| io_error(&entry.path, partial, e))?;

    Ok(written)
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn file_time(ts: DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(ts.timestamp(), ts.timestamp_subsec_nanos())
}
