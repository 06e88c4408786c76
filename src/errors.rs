//! Defines the crate's error types.
//!
//! None of these escape [`crate::Crawler::crawl`]: the dispatcher converts every
//! failure into `stats.error`. They exist so the internal layers can decide what
//! to do (retry, fall back, or stop) from the type instead of from a message.

use thiserror::Error;

/// Boxed source error, used where the concrete type depends on an optional backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level crawl errors. Rendered into `stats.error`.
#[derive(Error, Debug)]
pub enum CrawlError {
    // --- Configuration Errors ---
    /// The source string is not a recognised URL or an existing directory.
    #[error("Invalid source '{0}': expected a GitHub URL, a git@/.git clone URL, or a local directory")]
    InvalidSource(String),

    /// A GitHub URL without both owner and repository segments.
    #[error("Invalid GitHub URL: {0}")]
    PathTooShort(String),

    /// The `tree/...` part matched neither a branch nor a tree SHA.
    #[error("Invalid path in repository")]
    InvalidRefPath,

    /// The branch listing came back empty or failed.
    #[error("Failed to fetch branches")]
    BranchLookup,

    // --- Fatal Remote Errors ---
    /// The repository existence check returned 404.
    #[error("Repository {owner}/{repo} not found. {hint}")]
    RepositoryNotFound {
        owner: String,
        repo: String,
        hint: String,
    },

    // --- Fallback Errors ---
    /// No clone capability was resolved at startup.
    #[error("{}: git clone capability is not available, {context}", crate::constants::FALLBACK_UNAVAILABLE)]
    CloneUnavailable { context: String },

    /// A subpath that does not exist in the cloned working tree.
    #[error("Subdirectory '{0}' not found in the cloned repository")]
    SubpathMissing(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Git(#[from] GitError),

    // --- I/O Errors ---
    #[error("I/O error accessing path '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, TLS, timeout or body read failure.
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A retryable status that was still returned after the last attempt.
    #[error("Request to {url} returned HTTP {status}")]
    RetryableStatus { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid base64 content for '{path}': {source}")]
    Base64 {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ApiError {
    /// Whether the generic backoff loop should try the request again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Transport { .. } | ApiError::RetryableStatus { .. }
        )
    }
}

/// Errors raised by the clone capability.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to clone repository from '{url}': {source}")]
    CloneFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to fetch from remote '{remote}': {source}")]
    FetchFailed {
        remote: String,
        #[source]
        source: BoxError,
    },

    #[error("Could not find remote branch or tag named '{name}' after fetch")]
    RefNotFound { name: String },

    #[error("Failed to determine default branch: {0}")]
    DefaultBranchResolution(String),

    #[error("Failed to update cached repository: {0}")]
    UpdateFailed(String),

    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

/// Invalid crawler settings, reported before any crawl starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for '{option}': {reason}")]
    InvalidValue { option: String, reason: String },
}

/// Helper function to create a `CrawlError::IoError` with path context.
pub fn io_error_with_path<P: AsRef<std::path::Path>>(
    source: std::io::Error,
    path: P,
) -> CrawlError {
    CrawlError::IoError {
        path: path.as_ref().display().to_string(),
        source,
    }
}
