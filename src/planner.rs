//! Per-entry write decisions.
//!
//! Every archive entry is joined against the local files by relative path and the
//! active [`Policy`] decides whether it is written. Timestamps must be strictly
//! newer to trigger a write; equal times are left alone under both policies.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Policy;
use crate::extract::{normalize_entry_path, resolve_destination};
use crate::inventory::{LocalIndex, LocalState};
use crate::zip::ArchiveEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Write,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// No local copy exists
    New,
    /// The archive copy is newer than the local one
    ArchiveNewer,
    /// The policy leaves the local state as it is
    PolicySkip,
    /// Directory entries are created by the extractor, never written
    IsDirectoryMarker,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::New => "new",
            Reason::ArchiveNewer => "archive newer",
            Reason::PolicySkip => "not newer",
            Reason::IsDirectoryMarker => "directory",
        })
    }
}

/// What to do with one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionDecision {
    /// Position of the entry in the catalog
    pub entry_index: usize,
    pub archive_path: String,
    /// Absolute, normalized target path
    pub destination: PathBuf,
    pub action: Action,
    pub reason: Reason,
}

impl ExtractionDecision {
    pub fn is_write(&self) -> bool {
        self.action == Action::Write
    }
}

/// Apply `policy` to one entry given the current local state.
pub fn decide(
    policy: Policy,
    archive_modified: DateTime<Utc>,
    local: LocalState,
) -> (Action, Reason) {
    match (policy, local) {
        (Policy::Update, LocalState::Missing) => (Action::Write, Reason::New),
        (Policy::Freshen, LocalState::Missing) => (Action::Skip, Reason::PolicySkip),
        (_, LocalState::Present { modified_at }) if archive_modified > modified_at => {
            (Action::Write, Reason::ArchiveNewer)
        }
        (_, LocalState::Present { .. }) => (Action::Skip, Reason::PolicySkip),
    }
}

/// Produce one decision per distinct archive path, in archive order.
///
/// Names are compared after normalization, so `a.txt` and `./a.txt` are the
/// same path. When a path occurs more than once only its last record is
/// planned; earlier records are passed over. Names that escape the
/// destination are never looked up locally and are left for the extractor to
/// refuse.
pub async fn plan(
    entries: &[ArchiveEntry],
    local: LocalIndex<'_>,
    policy: Policy,
    destination_root: &Path,
) -> Vec<ExtractionDecision> {
    let root = std::path::absolute(destination_root)
        .unwrap_or_else(|_| destination_root.to_path_buf());

    let normalized: Vec<Option<String>> = entries
        .iter()
        .map(|entry| normalize_entry_path(&entry.path))
        .collect();
    let keys: Vec<&str> = entries
        .iter()
        .zip(&normalized)
        .map(|(entry, relative)| relative.as_deref().unwrap_or(entry.path.as_str()))
        .collect();

    let mut last_occurrence: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    for (index, key) in keys.iter().enumerate() {
        last_occurrence.insert(*key, index);
    }

    let mut decisions = Vec::with_capacity(last_occurrence.len());

    for (index, entry) in entries.iter().enumerate() {
        if last_occurrence.get(keys[index]) != Some(&index) {
            tracing::debug!(path = %entry.path, index, "superseded by a later record");
            continue;
        }

        let destination = resolve_destination(&root, &entry.path)
            .unwrap_or_else(|_| root.join(&entry.path));

        let (action, reason) = if entry.is_directory {
            (Action::Skip, Reason::IsDirectoryMarker)
        } else {
            let state = match &normalized[index] {
                Some(relative) => local.state(relative).await,
                None => LocalState::Missing,
            };
            decide(policy, entry.modified_at, state)
        };

        tracing::debug!(path = %entry.path, ?action, %reason, "planned");

        decisions.push(ExtractionDecision {
            entry_index: index,
            archive_path: entry.path.clone(),
            destination,
            action,
            reason,
        });
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn present(offset_secs: i64) -> LocalState {
        LocalState::Present {
            modified_at: t0() + Duration::seconds(offset_secs),
        }
    }

    #[rstest]
    #[case(Policy::Update, LocalState::Missing, Action::Write, Reason::New)]
    #[case(Policy::Freshen, LocalState::Missing, Action::Skip, Reason::PolicySkip)]
    #[case(Policy::Update, present(-10), Action::Write, Reason::ArchiveNewer)]
    #[case(Policy::Freshen, present(-10), Action::Write, Reason::ArchiveNewer)]
    #[case(Policy::Update, present(0), Action::Skip, Reason::PolicySkip)]
    #[case(Policy::Freshen, present(0), Action::Skip, Reason::PolicySkip)]
    #[case(Policy::Update, present(10), Action::Skip, Reason::PolicySkip)]
    #[case(Policy::Freshen, present(10), Action::Skip, Reason::PolicySkip)]
    fn decision_table(
        #[case] policy: Policy,
        #[case] local: LocalState,
        #[case] action: Action,
        #[case] reason: Reason,
    ) {
        assert_eq!(decide(policy, t0(), local), (action, reason));
    }

    #[test]
    fn write_iff_strictly_newer_when_local_exists() {
        for policy in [Policy::Update, Policy::Freshen] {
            for offset in -3..=3 {
                let (action, _) = decide(policy, t0(), present(offset));
                assert_eq!(action == Action::Write, offset < 0, "{policy:?} offset {offset}");
            }
        }
    }

    #[test]
    fn sub_second_local_time_is_newer_than_archive() {
        let local = LocalState::Present {
            modified_at: t0() + Duration::milliseconds(1),
        };
        assert_eq!(decide(Policy::Update, t0(), local).0, Action::Skip);
    }

    fn entry(path: &str) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            compression_method: crate::zip::CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            flags: 0,
            modified_at: t0(),
            mode: None,
            is_directory: path.ends_with('/'),
        }
    }

    #[tokio::test]
    async fn equivalent_names_collapse_to_the_last_record() {
        let entries = [entry("a.txt"), entry("b.txt"), entry("./a.txt")];
        let inventory = crate::inventory::Inventory::default();

        let decisions = plan(
            &entries,
            LocalIndex::Sources(&inventory),
            Policy::Update,
            Path::new("/dest"),
        )
        .await;

        let planned: Vec<usize> = decisions.iter().map(|d| d.entry_index).collect();
        assert_eq!(planned, [1, 2]);
        assert_eq!(decisions[1].destination, Path::new("/dest/a.txt"));
    }

    #[tokio::test]
    async fn destination_is_absolute() {
        let entries = [entry("dir/./b.txt")];
        let inventory = crate::inventory::Inventory::default();

        let decisions = plan(
            &entries,
            LocalIndex::Sources(&inventory),
            Policy::Update,
            Path::new("out"),
        )
        .await;

        let destination = &decisions[0].destination;
        assert!(destination.is_absolute(), "{}", destination.display());
        assert!(destination.ends_with("out/dir/b.txt"));
    }
}
