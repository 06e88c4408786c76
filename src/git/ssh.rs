// src/git/ssh.rs
//! Direct clones of `git@`/`.git` sources into a throwaway directory.

use super::RepoCloner;
use crate::aggregate::{Harvest, PathKeys};
use crate::discovery::walk_local;
use crate::errors::{io_error_with_path, CrawlError};
use crate::filtering::PatternFilter;
use log::info;
use tempfile::Builder as TempDirBuilder;

/// Clones `url` into a fresh temporary directory and walks it.
///
/// The directory is removed when this function returns, whatever the outcome.
///
/// # Errors
/// `CloneUnavailable` when no clone capability exists, `Git` when the clone
/// fails, and `IoError` when the temporary directory cannot be created.
pub fn crawl_clone_url(
    cloner: Option<&dyn RepoCloner>,
    url: &str,
    filter: &PatternFilter,
    max_file_size: u64,
    depth: Option<u32>,
) -> Result<Harvest, CrawlError> {
    let Some(cloner) = cloner else {
        return Err(CrawlError::CloneUnavailable {
            context: format!("cannot clone {}", url),
        });
    };

    let temp_dir = TempDirBuilder::new()
        .prefix("repocrawl-ssh-")
        .tempdir()
        .map_err(|e| io_error_with_path(e, std::env::temp_dir()))?;
    info!("Cloning {} to temp dir {} ...", url, temp_dir.path().display());

    cloner.clone_repo(url, temp_dir.path(), None, depth)?;
    walk_local(temp_dir.path(), "", filter, &PathKeys::new("", false), max_file_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::FakeCloner;

    #[test]
    fn test_missing_capability() {
        let err = crawl_clone_url(None, "git@github.com:acme/demo.git", &PatternFilter::default(), 1024, None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "fallback unavailable: git clone capability is not available, cannot clone git@github.com:acme/demo.git"
        );
    }

    #[test]
    fn test_temp_dir_removed_after_success() {
        let cloner = FakeCloner::with_files(&[("src/main.rs", "fn main() {}"), ("big.bin", "0123456789")]);
        let harvest = crawl_clone_url(
            Some(&cloner),
            "git@github.com:acme/demo.git",
            &PatternFilter::default(),
            5,
            Some(1),
        )
        .unwrap();

        assert_eq!(harvest.files.len(), 0);
        assert_eq!(harvest.skipped().len(), 2);
        let dest = cloner.clones.lock().unwrap()[0].1.clone();
        assert!(!dest.exists());
    }

    #[test]
    fn test_temp_dir_removed_after_clone_error() {
        let cloner = FakeCloner::failing("Permission denied (publickey)");
        let err = crawl_clone_url(
            Some(&cloner),
            "git@github.com:acme/demo.git",
            &PatternFilter::default(),
            1024,
            None,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Permission denied"));
        let dest = cloner.clones.lock().unwrap()[0].1.clone();
        assert!(!dest.exists());
    }
}
