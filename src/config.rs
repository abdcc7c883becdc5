//! Run configuration shared by every stage of a synchronization.

use std::path::PathBuf;

/// Which archive entries are allowed to reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Extract if no local copy exists or the archive copy is newer.
    #[default]
    Update,
    /// Extract only over an existing local copy that is older than the archive copy.
    Freshen,
}

/// What the extractor does after an entry fails to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Stop at the first failed entry.
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining entries.
    Continue,
}

/// Immutable settings for one run, built once by the driver.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub policy: Policy,
    /// Paths walked to find local copies. Empty means "the destination tree".
    pub sources: Vec<PathBuf>,
    pub quiet: bool,
    pub strictness: Strictness,
}

impl ExtractConfig {
    pub fn new(archive: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            destination: destination.into(),
            policy: Policy::default(),
            sources: Vec::new(),
            quiet: false,
            strictness: Strictness::default(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }
}
