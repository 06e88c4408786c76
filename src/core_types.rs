//! Defines the data structures that flow through a crawl.
//!
//! A crawl takes one [`FetchRequest`] and always produces one [`FetchResult`].
//! Everything in between ([`RepoRef`], [`TreeEntry`], [`SkipRecord`]) lives only
//! for the duration of that call.

use crate::constants::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The input of one crawl. Immutable once handed to the crawler.
///
/// # Examples
///
/// ```
/// use repocrawl::FetchRequest;
///
/// let request = FetchRequest::new("https://github.com/acme/demo/tree/main/src")
///     .include(["*.py"])
///     .exclude(["tests/*"])
///     .max_file_size(100 * 1024)
///     .relative_paths(true);
///
/// assert_eq!(request.max_file_size, 100 * 1024);
/// assert!(request.use_relative_paths);
/// assert!(request.token.is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// HTTPS repository URL, API URL, `git@`/`.git` URL, or a local directory.
    pub source: String,
    /// Bearer credential. `None` means unauthenticated (and rate-limited) access.
    pub token: Option<String>,
    /// Files strictly larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Glob patterns a file must match to be included. `None` or empty includes everything.
    pub include_patterns: Option<BTreeSet<String>>,
    /// Glob patterns that exclude a file or prune a directory. Exclusion always wins.
    pub exclude_patterns: Option<BTreeSet<String>>,
    /// Key files relative to the requested subpath instead of the repository root.
    pub use_relative_paths: bool,
}

impl FetchRequest {
    /// Creates a request with default limits and no patterns.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            token: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            include_patterns: None,
            exclude_patterns: None,
            use_relative_paths: false,
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn relative_paths(mut self, enabled: bool) -> Self {
        self.use_relative_paths = enabled;
        self
    }
}

// The token must never end up in logs.
impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("source", &self.source)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("max_file_size", &self.max_file_size)
            .field("include_patterns", &self.include_patterns)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("use_relative_paths", &self.use_relative_paths)
            .finish()
    }
}

/// A repository location resolved from a [`FetchRequest`] source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    /// Branch, tag or SHA. `None` lets the host pick its default branch.
    pub git_ref: Option<String>,
    /// Path inside the repository, without leading or trailing slashes. Empty for the root.
    pub subpath: String,
}

impl RepoRef {
    /// The `{owner}_{repo}` key used for the persistent clone cache.
    ///
    /// `%` and `_` in the owner are percent-escaped so the first `_` always
    /// separates owner from repository. GitHub logins never contain either.
    pub fn cache_key(&self) -> String {
        let owner = self.owner.replace('%', "%25").replace('_', "%5F");
        format!("{}_{}", owner, self.repo.replace('/', "_"))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(git_ref) = &self.git_ref {
            write!(f, "@{}", git_ref)?;
        }
        if !self.subpath.is_empty() {
            write!(f, ":{}", self.subpath)?;
        }
        Ok(())
    }
}

/// Kind of an item returned by the contents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and submodules. Never downloaded or traversed.
    #[serde(other)]
    Other,
}

/// One item of a contents API listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    /// Path from the repository root.
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    /// The contents endpoint for this entry, used when no `download_url` is listed.
    #[serde(default)]
    pub url: Option<String>,
}

impl TreeEntry {
    /// The basename, falling back to the last path segment when `name` is absent.
    pub fn basename(&self) -> &str {
        if self.name.is_empty() {
            self.path.rsplit('/').next().unwrap_or(&self.path)
        } else {
            &self.name
        }
    }
}

/// Why a file was left out of the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Oversize,
    Excluded,
}

/// A file that was seen but not downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub path: String,
    pub size: u64,
    pub reason: SkipReason,
}

/// Which strategy produced the files of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Api,
    GitClone,
    SshClone,
    Local,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Api => "api",
            Source::GitClone => "git_clone",
            Source::SshClone => "ssh_clone",
            Source::Local => "local",
        };
        f.write_str(name)
    }
}

/// Statistics that accompany every result, including failed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStats {
    pub downloaded_count: usize,
    pub skipped_count: usize,
    pub skipped_files: Vec<SkipRecord>,
    pub base_path: Option<String>,
    pub include_patterns: Option<BTreeSet<String>>,
    pub exclude_patterns: Option<BTreeSet<String>>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The only value a crawl returns.
///
/// `files` keys are unique, relative, and always use forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub files: BTreeMap<String, String>,
    pub stats: FetchStats,
}

impl FetchResult {
    /// Returns `true` when the crawl reported no error.
    pub fn is_success(&self) -> bool {
        self.stats.error.is_none()
    }
}
