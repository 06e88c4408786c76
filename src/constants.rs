// src/constants.rs

/// Hard bound on the remote traversal stack depth.
pub const MAX_TRAVERSAL_DEPTH: usize = 50;

/// Blob count above which the crawler clones instead of walking the API.
pub const CLONE_FALLBACK_THRESHOLD: usize = 1000;

/// Default per-file size ceiling (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Total attempts (first try included) for every GET.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Status codes retried with exponential backoff.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_CLONE_BASE_URL: &str = "https://github.com";
pub const GITHUB_WEB_HOST: &str = "github.com";
pub const GITHUB_API_HOST: &str = "api.github.com";

pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
pub const DEFAULT_USER_AGENT: &str = concat!("repocrawl/", env!("CARGO_PKG_VERSION"));

/// Directory under the system temp root holding persistent fallback clones.
pub const CACHE_DIR_NAME: &str = "repocrawl-cache";

/// Page size and page cap when listing branches.
pub const BRANCHES_PER_PAGE: usize = 100;
pub const MAX_BRANCH_PAGES: usize = 10;

/// Error text prefix used whenever the clone capability is missing.
pub const FALLBACK_UNAVAILABLE: &str = "fallback unavailable";
