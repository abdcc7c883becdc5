use clap::Parser;
use std::path::PathBuf;

use crate::config::{ExtractConfig, Policy, Strictness};
use crate::error::UsageError;

#[derive(Parser, Debug)]
#[command(name = "zipfresh")]
#[command(version)]
#[command(about = "Extract a ZIP archive onto a directory tree, updating or freshening files", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipfresh data.zip -d out            extract new and newer files into out/\n  \
  zipfresh -f data.zip -d out         only refresh files already in out/\n  \
  zipfresh data.zip -d out src/ a.txt compare against src/ and a.txt instead of out/\n  \
  zipfresh -l data.zip                list entries with sizes and timestamps")]
pub struct Cli {
    /// ZIP file to extract
    #[arg(value_name = "ZIPFILE")]
    pub zipfile: PathBuf,

    /// Local files or directories to compare against (default: the destination)
    #[arg(value_name = "SOURCES")]
    pub sources: Vec<PathBuf>,

    /// List entries in the zip file
    #[arg(short = 'l')]
    pub list: bool,

    /// Suppress normal output
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Update files, creating those not yet present (default)
    #[arg(short = 'u')]
    pub update: bool,

    /// Freshen existing files only; never create new ones
    #[arg(short = 'f')]
    pub freshen: bool,

    /// Base directory to extract to
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: PathBuf,

    /// Keep extracting remaining entries after one fails
    #[arg(short = 'k', long = "keep-going")]
    pub keep_going: bool,
}

impl Cli {
    pub fn policy(&self) -> Result<Policy, UsageError> {
        match (self.update, self.freshen) {
            (true, true) => Err(UsageError::ConflictingPolicies),
            (_, true) => Ok(Policy::Freshen),
            _ => Ok(Policy::Update),
        }
    }

    /// Validate the flags and build the run configuration
    pub fn to_config(&self) -> Result<ExtractConfig, UsageError> {
        let strictness = if self.keep_going {
            Strictness::Continue
        } else {
            Strictness::Abort
        };

        Ok(ExtractConfig::new(self.zipfile.clone(), self.extract_dir.clone())
            .with_policy(self.policy()?)
            .with_sources(self.sources.iter().cloned())
            .with_quiet(self.quiet)
            .with_strictness(strictness))
    }
}
