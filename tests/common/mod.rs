// tests/common/mod.rs

#![allow(dead_code)] // Each test crate uses a different subset of these helpers.

use repocrawl::api::{Clock, Sleeper};
use repocrawl::{ConfigBuilder, Crawler};
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed "now" used by every crawler built here, in Unix seconds.
pub const NOW: u64 = 1_700_000_000;

// Helper function to get the binary command
pub fn repocrawl_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repocrawl"));
    cmd.env_remove("GITHUB_TOKEN");
    cmd
}

/// Records sleeps instead of blocking the test.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        NOW
    }
}

/// A crawler pointed at a mock API server, with no clone capability and no real sleeps.
pub fn crawler(api_url: &str, cache: &Path, sleeper: Arc<RecordingSleeper>) -> Crawler {
    crawler_with(ConfigBuilder::new().api_base_url(api_url).cache_root(cache), sleeper)
}

pub fn crawler_with(builder: ConfigBuilder, sleeper: Arc<RecordingSleeper>) -> Crawler {
    Crawler::new(builder.build().unwrap())
        .unwrap()
        .with_sleeper(sleeper)
        .with_clock(Arc::new(FixedClock))
        .with_cloner(None)
}

/// JSON for one `type: file` contents entry whose raw body is served at `{base}/raw/{path}`.
pub fn file_entry(base: &str, path: &str, size: u64) -> String {
    let name = path.rsplit('/').next().unwrap();
    format!(
        r#"{{"path": "{path}", "name": "{name}", "type": "file", "size": {size}, "download_url": "{base}/raw/{path}"}}"#
    )
}

pub fn dir_entry(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap();
    format!(r#"{{"path": "{path}", "name": "{name}", "type": "dir", "size": 0, "download_url": null}}"#)
}

/// A recursive tree listing with `blobs` blob entries.
pub fn tree_listing(blobs: usize) -> String {
    let entries: Vec<String> = (0..blobs)
        .map(|i| format!(r#"{{"path": "file{i}.txt", "mode": "100644", "type": "blob"}}"#))
        .collect();
    format!(r#"{{"sha": "abc", "tree": [{}], "truncated": false}}"#, entries.join(","))
}

/// Creates `{base}/{owner}/{repo}.git` as a bare repository holding `files`.
#[cfg(feature = "git")]
pub fn bare_remote(
    base: &Path,
    owner: &str,
    repo: &str,
    files: &[(&str, &str)],
) -> Result<git2::Repository, git2::Error> {
    let repository = git2::Repository::init_bare(base.join(owner).join(format!("{repo}.git")))?;
    commit_files(&repository, files, "Initial commit")?;
    Ok(repository)
}

/// Commits `files` on top of HEAD in a bare repository.
#[cfg(feature = "git")]
pub fn commit_files(repo: &git2::Repository, files: &[(&str, &str)], message: &str) -> Result<(), git2::Error> {
    let mut index = repo.index()?;
    if let Ok(tree) = repo.head().and_then(|h| h.peel_to_tree()) {
        index.read_tree(&tree)?;
    }
    for (path, content) in files {
        let oid = repo.blob(content.as_bytes())?;
        index.add(&git2::IndexEntry {
            ctime: git2::IndexTime::new(0, 0),
            mtime: git2::IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: content.len() as u32,
            id: oid,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        })?;
    }
    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = git2::Signature::now("Test", "test@example.com")?;
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(())
}

/// `file://` URL of a directory, usable as a clone base URL.
#[cfg(feature = "git")]
pub fn file_url(path: &Path) -> String {
    url::Url::from_directory_path(path).unwrap().to_string()
}
