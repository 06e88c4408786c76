// src/git/mod.rs
//! Source classification and the git clone branches of a crawl.
//!
//! This module provides:
//! - Classification of a source string into a clone URL, GitHub location or local path.
//! - The [`RepoCloner`] capability, implemented with `git2` behind the `git` feature.
//! - The persistent, cached fallback clone and the ephemeral SSH clone.

mod clone;
#[cfg(feature = "git")]
mod ops;
mod ssh;
mod url;

use crate::errors::GitError;
use crate::progress::ProgressReporter;
use std::path::Path;
use std::sync::Arc;

pub use clone::{cache_dir_for, prepare_cached_clone};
#[cfg(feature = "git")]
pub use ops::Git2Cloner;
pub use ssh::crawl_clone_url;
pub use url::{classify_source, is_clone_url, normalize_api_url, GitHubLocation, SourceKind};

/// The ability to clone and update git repositories.
///
/// Resolved once at startup by [`detect_clone_capability`] and passed to the
/// crawler, so no code path inspects the environment on its own.
pub trait RepoCloner: Send + Sync {
    /// Clones `url` into `dest` and checks out `branch` (the remote default when `None`).
    fn clone_repo(&self, url: &str, dest: &Path, branch: Option<&str>, depth: Option<u32>) -> Result<(), GitError>;

    /// Fetches `origin` and moves the working tree to the tip of `branch`.
    fn update_repo(&self, dest: &Path, branch: Option<&str>, depth: Option<u32>) -> Result<(), GitError>;

    /// Whether `path` holds a repository this cloner can update.
    fn is_repo(&self, path: &Path) -> bool;

    /// Branch and tag names advertised by `url`, without cloning.
    fn remote_refs(&self, url: &str) -> Result<Vec<String>, GitError>;
}

/// Returns the clone capability compiled into this build, if any.
pub fn detect_clone_capability(progress: Option<Arc<dyn ProgressReporter>>) -> Option<Arc<dyn RepoCloner>> {
    #[cfg(feature = "git")]
    {
        Some(Arc::new(Git2Cloner::new(progress)))
    }
    #[cfg(not(feature = "git"))]
    {
        let _ = progress;
        log::debug!("Built without the `git` feature; clone fallback is unavailable.");
        None
    }
}
