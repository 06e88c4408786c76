// src/git/clone.rs
//! The persistent clone cache used when the API walk is abandoned.

use super::RepoCloner;
use crate::core_types::RepoRef;
use crate::errors::{io_error_with_path, CrawlError};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The cache directory for a repository: `<cache_root>/<owner>_<repo>`.
pub fn cache_dir_for(cache_root: &Path, repo_ref: &RepoRef) -> PathBuf {
    cache_root.join(repo_ref.cache_key())
}

/// Makes sure the cache holds an up-to-date working tree of `repo_ref` and
/// returns its path.
///
/// A cache hit is updated in place; a miss is cloned (shallow when `depth` is
/// set). An entry that exists but is not a repository is removed and re-cloned.
/// The cache is not locked: concurrent crawls of the same repository must be
/// serialized by the caller.
///
/// # Errors
/// Returns `Git` when cloning or updating fails and `IoError` when the cache
/// directory cannot be prepared.
pub fn prepare_cached_clone(
    cloner: &dyn RepoCloner,
    cache_root: &Path,
    clone_url: &str,
    repo_ref: &RepoRef,
    depth: Option<u32>,
) -> Result<PathBuf, CrawlError> {
    let repo_path = cache_dir_for(cache_root, repo_ref);
    let branch = repo_ref.git_ref.as_deref();

    if repo_path.exists() {
        if cloner.is_repo(&repo_path) {
            info!(
                "Found cached repository for '{}' at '{}'. Pulling updates...",
                clone_url,
                repo_path.display()
            );
            cloner.update_repo(&repo_path, branch, depth)?;
            return Ok(repo_path);
        }

        warn!(
            "Cached entry at '{}' is not a repository. Re-cloning...",
            repo_path.display()
        );
        remove_entry(&repo_path)?;
    }

    fs::create_dir_all(cache_root).map_err(|e| io_error_with_path(e, cache_root))?;
    info!(
        "Cloning {} into cache {} (depth {:?})...",
        clone_url,
        repo_path.display(),
        depth
    );
    cloner.clone_repo(clone_url, &repo_path, branch, depth)?;
    Ok(repo_path)
}

fn remove_entry(path: &Path) -> Result<(), CrawlError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| io_error_with_path(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::FakeCloner;
    use anyhow::Result;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn repo_ref(git_ref: Option<&str>) -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            repo: "demo".into(),
            git_ref: git_ref.map(str::to_string),
            subpath: String::new(),
        }
    }

    #[test]
    fn test_cache_miss_clones_then_hit_updates() -> Result<()> {
        let cache = tempdir()?;
        let cloner = FakeCloner::with_files(&[("a.txt", "a")]);

        // 1. Cache miss
        let path = prepare_cached_clone(&cloner, cache.path(), "url", &repo_ref(Some("dev")), Some(1))?;
        assert_eq!(path, cache.path().join("acme_demo"));
        assert_eq!(cloner.clones.lock().unwrap().len(), 1);
        assert_eq!(cloner.clones.lock().unwrap()[0].2.as_deref(), Some("dev"));

        // 2. Cache hit
        let again = prepare_cached_clone(&cloner, cache.path(), "url", &repo_ref(Some("dev")), Some(1))?;
        assert_eq!(path, again);
        assert_eq!(cloner.clones.lock().unwrap().len(), 1);
        assert_eq!(cloner.updates.lock().unwrap().len(), 1);
        Ok(())
    }

    #[test]
    fn test_corrupted_entry_is_recloned() -> Result<()> {
        let cache = tempdir()?;
        let entry = cache.path().join("acme_demo");
        File::create(&entry)?.write_all(b"corruption")?;

        let cloner = FakeCloner::with_files(&[("a.txt", "a")]);
        let path = prepare_cached_clone(&cloner, cache.path(), "url", &repo_ref(None), None)?;
        assert!(path.is_dir());
        assert_eq!(fs::read_to_string(path.join("a.txt"))?, "a");
        Ok(())
    }

    #[test]
    fn test_clone_error_is_propagated() -> Result<()> {
        let cache = tempdir()?;
        let cloner = FakeCloner::failing("remote hung up");
        let err = prepare_cached_clone(&cloner, cache.path(), "url", &repo_ref(None), None).unwrap_err();
        assert!(err.to_string().contains("remote hung up"));
        Ok(())
    }

    #[cfg(feature = "git")]
    #[test]
    fn test_git2_cache_miss_hit_and_update() -> Result<()> {
        use crate::git::ops::tests::{add_commit_to_repo, file_url, setup_test_remote_repo};
        use crate::git::Git2Cloner;

        let (remote_dir, remote_repo) = setup_test_remote_repo()?;
        add_commit_to_repo(&remote_repo, "file.txt", "content v1", "Initial")?;
        let url = file_url(remote_dir.path());
        let cache = tempdir()?;
        let cloner = Git2Cloner::default();

        // 1. Cache miss
        let cached = prepare_cached_clone(&cloner, cache.path(), &url, &repo_ref(None), None)?;
        assert_eq!(fs::read_to_string(cached.join("file.txt"))?, "content v1");

        // 2. Remote moves on, cache hit pulls it in
        add_commit_to_repo(&remote_repo, "file.txt", "content v2", "Update")?;
        let updated = prepare_cached_clone(&cloner, cache.path(), &url, &repo_ref(None), None)?;
        assert_eq!(cached, updated);
        assert_eq!(fs::read_to_string(updated.join("file.txt"))?, "content v2");
        Ok(())
    }

    #[cfg(feature = "git")]
    #[test]
    fn test_git2_corrupted_cache_recovery() -> Result<()> {
        use crate::git::ops::tests::{add_commit_to_repo, file_url, setup_test_remote_repo};
        use crate::git::Git2Cloner;

        let (remote_dir, remote_repo) = setup_test_remote_repo()?;
        add_commit_to_repo(&remote_repo, "file.txt", "content", "Initial")?;
        let cache = tempdir()?;
        // A directory that is not a repository.
        fs::create_dir_all(cache.path().join("acme_demo").join("junk"))?;

        let cached = prepare_cached_clone(
            &Git2Cloner::default(),
            cache.path(),
            &file_url(remote_dir.path()),
            &repo_ref(None),
            None,
        )?;
        assert_eq!(fs::read_to_string(cached.join("file.txt"))?, "content");
        assert!(!cached.join("junk").exists());
        Ok(())
    }
}
