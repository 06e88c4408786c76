// src/config/builder.rs

use super::parsing::parse_max_size;
use super::validation::{normalize_base_url, require_non_zero};
use super::{default_cache_root, CrawlerConfig};
use crate::api::RetryPolicy;
use crate::cli::Cli;
use crate::core_types::FetchRequest;
use crate::errors::ConfigError;
use std::path::PathBuf;

/// Builds a [`CrawlerConfig`], validating every value set on it.
///
/// # Examples
///
/// ```
/// use repocrawl::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("http://127.0.0.1:8080/")
///     .clone_depth(None)
///     .clone_threshold(10)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.api_base_url, "http://127.0.0.1:8080");
/// assert_eq!(config.clone_depth, None);
/// assert_eq!(config.clone_threshold, 10);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    api_base_url: Option<String>,
    clone_base_url: Option<String>,
    cache_root: Option<PathBuf>,
    clone_depth: Option<Option<u32>>,
    max_traversal_depth: Option<usize>,
    clone_threshold: Option<usize>,
    retry: Option<RetryPolicy>,
    user_agent: Option<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a builder with the remote options given on the command line.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut builder = Self::new();
        if let Some(url) = &cli.api_url {
            builder = builder.api_base_url(url);
        }
        if let Some(url) = &cli.clone_url {
            builder = builder.clone_base_url(url);
        }
        if let Some(path) = &cli.cache_path {
            builder = builder.cache_root(path);
        }
        if let Some(depth) = cli.max_depth {
            builder = builder.max_traversal_depth(depth);
        }
        if let Some(threshold) = cli.clone_threshold {
            builder = builder.clone_threshold(threshold);
        }
        if cli.full_clone {
            builder = builder.clone_depth(None);
        }
        builder
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn clone_base_url(mut self, url: impl Into<String>) -> Self {
        self.clone_base_url = Some(url.into());
        self
    }

    pub fn cache_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(path.into());
        self
    }

    /// `None` performs full clones.
    pub fn clone_depth(mut self, depth: Option<u32>) -> Self {
        self.clone_depth = Some(depth);
        self
    }

    pub fn max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = Some(depth);
        self
    }

    pub fn clone_threshold(mut self, blobs: usize) -> Self {
        self.clone_threshold = Some(blobs);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validates the settings and produces the config.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for relative or non-http(s) base URLs,
    /// a zero traversal depth, zero attempts, a zero clone depth or an empty
    /// user agent.
    pub fn build(self) -> Result<CrawlerConfig, ConfigError> {
        let defaults = CrawlerConfig::default();

        let api_base_url = match self.api_base_url {
            Some(url) => normalize_base_url("api_base_url", &url)?,
            None => defaults.api_base_url,
        };
        let clone_base_url = match self.clone_base_url {
            Some(url) => normalize_base_url("clone_base_url", &url)?,
            None => defaults.clone_base_url,
        };

        let clone_depth = self.clone_depth.unwrap_or(defaults.clone_depth);
        if clone_depth == Some(0) {
            return Err(ConfigError::InvalidValue {
                option: "clone_depth".to_string(),
                reason: "must be greater than zero (use None for a full clone)".to_string(),
            });
        }

        let retry = self.retry.unwrap_or(defaults.retry);
        require_non_zero("retry.max_attempts", retry.max_attempts)?;

        let user_agent = self.user_agent.unwrap_or(defaults.user_agent);
        if user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                option: "user_agent".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(CrawlerConfig {
            api_base_url,
            clone_base_url,
            cache_root: self.cache_root.unwrap_or_else(default_cache_root),
            clone_depth,
            max_traversal_depth: require_non_zero(
                "max_traversal_depth",
                self.max_traversal_depth.unwrap_or(defaults.max_traversal_depth),
            )?,
            clone_threshold: self.clone_threshold.unwrap_or(defaults.clone_threshold),
            retry,
            user_agent,
        })
    }
}

/// Builds the per-call request from the command line.
///
/// # Errors
/// Fails when `--max-size` is not a valid size.
pub fn request_from_cli(cli: &Cli) -> anyhow::Result<FetchRequest> {
    let mut request = FetchRequest::new(cli.source.trim()).relative_paths(cli.relative);
    if let Some(token) = &cli.token {
        request = request.token(token.as_str());
    }
    if let Some(max_size) = parse_max_size(cli.max_size.as_deref())? {
        request = request.max_file_size(max_size);
    }
    if let Some(patterns) = &cli.include_patterns {
        request = request.include(patterns.iter().cloned());
    }
    if let Some(patterns) = &cli.exclude_patterns {
        request = request.exclude(patterns.iter().cloned());
    }
    Ok(request)
}
