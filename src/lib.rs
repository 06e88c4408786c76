//! `repocrawl` turns a GitHub URL, a git clone URL or a local directory into a
//! filtered, size-bounded map of file contents.
//!
//! Public GitHub trees are walked through the REST contents API. Transient
//! failures are retried with exponential backoff and rate limits are waited
//! out. When the walk is abandoned, or a pre-check finds the repository too
//! large, the crawler falls back to a cached shallow git clone and walks it
//! with the same filter.
//!
//! Every call returns a [`FetchResult`]; failures are reported in
//! `stats.error` instead of through `Err`.
//!
//! # Example: Library Usage
//!
//! ```
//! use repocrawl::{ConfigBuilder, Crawler, FetchRequest};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempdir()?;
//! fs::create_dir_all(dir.path().join("src"))?;
//! fs::write(dir.path().join("src/main.py"), "print('hi')")?;
//! fs::write(dir.path().join("README.md"), "# Demo")?;
//!
//! let crawler = Crawler::new(ConfigBuilder::new().build()?)?;
//! let request = FetchRequest::new(dir.path().to_string_lossy())
//!     .include(["*.py"])
//!     .max_file_size(1024);
//! let result = crawler.crawl(&request);
//!
//! assert_eq!(result.files.keys().collect::<Vec<_>>(), vec!["src/main.py"]);
//! assert_eq!(result.stats.skipped_files[0].path, "README.md");
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod crawler;
pub mod discovery;
pub mod errors;
pub mod filtering;
pub mod git;
pub mod progress;

// Re-export key public types for easier use as a library
pub use config::{ConfigBuilder, CrawlerConfig};
pub use core_types::{FetchRequest, FetchResult, FetchStats, RepoRef, SkipReason, SkipRecord, Source};
pub use crawler::Crawler;
pub use errors::{ApiError, ConfigError, CrawlError, GitError};
