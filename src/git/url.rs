//! Classifies a source string before any network traffic happens.

use crate::constants::{GITHUB_API_HOST, GITHUB_WEB_HOST};
use crate::errors::CrawlError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use url::Url;

/// What kind of source a request names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// `git@...` or `*.git`. Cloned directly, bypassing the API.
    CloneUrl(String),
    /// A GitHub web (or rewritten API) URL.
    GitHub(GitHubLocation),
    /// An existing local directory.
    Local(PathBuf),
}

/// Owner and repository of a GitHub URL, plus the unresolved `tree/...` tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubLocation {
    pub owner: String,
    pub repo: String,
    /// Everything after `/tree/`. The ref may itself contain slashes, so splitting
    /// it into ref and subpath needs the branch list.
    pub tree_path: Option<String>,
}

/// Regex for API URLs: `https://api.github.com/repos/{rest}`
static API_REPOS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:https?://)?{}/repos/(.+)$",
        regex::escape(GITHUB_API_HOST)
    ))
    .unwrap()
});

/// Whether the source should take the direct-clone path.
///
/// # Examples
/// ```
/// use repocrawl::git::is_clone_url;
///
/// assert!(is_clone_url("git@github.com:acme/demo.git"));
/// assert!(is_clone_url("https://github.com/acme/demo.git"));
/// assert!(!is_clone_url("https://github.com/acme/demo"));
/// ```
pub fn is_clone_url(source: &str) -> bool {
    source.starts_with("git@") || source.ends_with(".git")
}

/// Rewrites `https://api.github.com/repos/o/r/...` into `https://github.com/o/r/...`.
///
/// # Examples
/// ```
/// use repocrawl::git::normalize_api_url;
///
/// assert_eq!(
///     normalize_api_url("https://api.github.com/repos/acme/demo").as_deref(),
///     Some("https://github.com/acme/demo")
/// );
/// assert!(normalize_api_url("https://github.com/acme/demo").is_none());
/// ```
pub fn normalize_api_url(source: &str) -> Option<String> {
    let caps = API_REPOS_URL_RE.captures(source)?;
    let rest = caps.get(1)?.as_str();
    Some(format!("https://{}/{}", GITHUB_WEB_HOST, rest))
}

/// Classifies `source`, in order: clone URL, API URL, GitHub web URL, local directory.
///
/// # Errors
/// `PathTooShort` for a GitHub URL without owner and repository, and
/// `InvalidSource` for anything that is neither a GitHub URL nor an existing directory.
pub fn classify_source(source: &str) -> Result<SourceKind, CrawlError> {
    let source = source.trim();
    if is_clone_url(source) {
        return Ok(SourceKind::CloneUrl(source.to_string()));
    }

    let web = match normalize_api_url(source) {
        Some(rewritten) => {
            log::info!("Converted API URL to: {}", rewritten);
            rewritten
        }
        None => source.to_string(),
    };

    if let Ok(url) = Url::parse(&web) {
        if matches!(url.scheme(), "http" | "https") {
            let host = url.host_str().unwrap_or_default();
            if host == GITHUB_WEB_HOST || host == format!("www.{}", GITHUB_WEB_HOST) {
                return parse_github_path(&web, url.path()).map(SourceKind::GitHub);
            }
            return Err(CrawlError::InvalidSource(source.to_string()));
        }
    }

    let path = Path::new(source);
    if path.is_dir() {
        Ok(SourceKind::Local(path.to_path_buf()))
    } else {
        Err(CrawlError::InvalidSource(source.to_string()))
    }
}

fn parse_github_path(url: &str, path: &str) -> Result<GitHubLocation, CrawlError> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() < 2 {
        return Err(CrawlError::PathTooShort(url.to_string()));
    }

    let owner = parts[0].to_string();
    let repo = parts[1].trim_end_matches(".git").to_string();
    // Only `tree/...` carries a ref; other pages (issues, blob, ...) mean the whole repo.
    let tree_path = match parts.get(2) {
        Some(&"tree") if parts.len() > 3 => Some(parts[3..].join("/")),
        _ => None,
    };

    Ok(GitHubLocation {
        owner,
        repo,
        tree_path,
    })
}
