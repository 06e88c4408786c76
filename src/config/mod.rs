//! Defines [`CrawlerConfig`], the process-wide settings of a [`crate::Crawler`].
//!
//! Per-call options (source, token, patterns, size limit) live in
//! [`crate::FetchRequest`] instead; one config serves many requests.

use crate::api::RetryPolicy;
use crate::constants::{
    CACHE_DIR_NAME, CLONE_FALLBACK_THRESHOLD, DEFAULT_API_BASE_URL, DEFAULT_CLONE_BASE_URL, DEFAULT_USER_AGENT,
    MAX_TRAVERSAL_DEPTH,
};
use std::path::PathBuf;

pub use builder::{request_from_cli, ConfigBuilder};
pub use parsing::parse_max_size;
mod builder;
mod parsing;
mod validation;

/// Settings shared by every crawl a [`crate::Crawler`] runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerConfig {
    /// Base of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Base used to build fallback clone URLs: `{clone_base_url}/{owner}/{repo}.git`.
    pub clone_base_url: String,
    /// Directory holding persistent fallback clones, one per repository.
    pub cache_root: PathBuf,
    /// History depth for fallback and SSH clones. `None` clones everything.
    pub clone_depth: Option<u32>,
    /// Bound on the remote traversal stack depth.
    pub max_traversal_depth: usize,
    /// Blob count above which the API walk is skipped in favour of a clone.
    pub clone_threshold: usize,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            clone_base_url: DEFAULT_CLONE_BASE_URL.to_string(),
            cache_root: default_cache_root(),
            clone_depth: Some(1),
            max_traversal_depth: MAX_TRAVERSAL_DEPTH,
            clone_threshold: CLONE_FALLBACK_THRESHOLD,
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    /// The URL the fallback engine clones for `owner/repo`.
    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/{}/{}.git", self.clone_base_url, owner, repo)
    }
}

/// `<system temp>/repocrawl-cache`.
pub fn default_cache_root() -> PathBuf {
    std::env::temp_dir().join(CACHE_DIR_NAME)
}
