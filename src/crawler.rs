// src/crawler.rs

//! The dispatcher: classifies a source and runs the matching retrieval branch.
//!
//! ```text
//! source ─┬─ git@/.git ──────────────► ephemeral clone ─► local walk
//!         ├─ local directory ────────► local walk
//!         └─ GitHub URL ─► refs ─► pre-check ─┬─ walk ─► contents API walk
//!                                             └─ clone ─┐     │ exhausted
//!                                                       ▼     ▼
//!                                               cached clone ─► local walk
//! ```

use crate::aggregate::{assemble, failure, Harvest, PathKeys, RemoteOutcome};
use crate::api::refs::split_against_refs;
use crate::api::{
    resolve_repo_ref, run_precheck, Clock, GitHubClient, HttpTransport, Precheck, RemoteTreeWalker, ReqwestTransport,
    Sleeper, SystemClock, ThreadSleeper, WalkFailure,
};
use crate::config::CrawlerConfig;
use crate::core_types::{FetchRequest, FetchResult, RepoRef, Source};
use crate::discovery::walk_local;
use crate::errors::CrawlError;
use crate::filtering::PatternFilter;
use crate::git::{
    classify_source, crawl_clone_url, detect_clone_capability, prepare_cached_clone, GitHubLocation, RepoCloner,
    SourceKind,
};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Runs crawls against one configuration.
///
/// The clone capability is resolved once, when the crawler is built, and can
/// be replaced with [`Crawler::with_cloner`].
///
/// # Examples
///
/// ```
/// use repocrawl::{Crawler, CrawlerConfig, FetchRequest, Source};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// std::fs::write(dir.path().join("notes.md"), "# Notes")?;
///
/// let crawler = Crawler::new(CrawlerConfig::default())?;
/// let result = crawler.crawl(&FetchRequest::new(dir.path().to_string_lossy()));
///
/// assert!(result.is_success());
/// assert_eq!(result.files["notes.md"], "# Notes");
/// assert_eq!(result.stats.source, Source::Local);
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    config: CrawlerConfig,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    cloner: Option<Arc<dyn RepoCloner>>,
}

impl Crawler {
    /// Creates a crawler with the reqwest transport and the clone capability
    /// compiled into this build.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be initialised.
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(SystemClock),
            cloner: detect_clone_capability(None),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the clone capability. `None` disables every clone branch.
    pub fn with_cloner(mut self, cloner: Option<Arc<dyn RepoCloner>>) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls `request.source`.
    ///
    /// Never fails: configuration errors, missing repositories and exhausted
    /// fallbacks are all reported through `stats.error`.
    pub fn crawl(&self, request: &FetchRequest) -> FetchResult {
        let result = match classify_source(&request.source) {
            Ok(SourceKind::CloneUrl(url)) => self.crawl_ssh(request, &url),
            Ok(SourceKind::Local(path)) => self.crawl_local(request, &path),
            Ok(SourceKind::GitHub(location)) => self.crawl_github(request, &location),
            Err(e) => failure(request, &PathKeys::new("", false), Source::Api, e.to_string()),
        };

        info!(
            "Downloaded {} files, skipped {} (source: {})",
            result.stats.downloaded_count, result.stats.skipped_count, result.stats.source
        );
        if let Some(error) = &result.stats.error {
            warn!("Crawl of {} finished with an error: {}", request.source, error);
        }
        result
    }

    fn crawl_ssh(&self, request: &FetchRequest, url: &str) -> FetchResult {
        let keys = PathKeys::new("", false);
        let filter = request_filter(request);
        match crawl_clone_url(
            self.cloner.as_deref(),
            url,
            &filter,
            request.max_file_size,
            self.config.clone_depth,
        ) {
            Ok(harvest) => assemble(request, harvest, &keys, Source::SshClone, None),
            Err(e) => failure(request, &keys, Source::SshClone, e.to_string()),
        }
    }

    fn crawl_local(&self, request: &FetchRequest, root: &Path) -> FetchResult {
        let keys = PathKeys::new("", false);
        let filter = request_filter(request);
        match walk_local(root, "", &filter, &keys, request.max_file_size) {
            Ok(harvest) => assemble(request, harvest, &keys, Source::Local, None),
            Err(e) => failure(request, &keys, Source::Local, e.to_string()),
        }
    }

    fn crawl_github(&self, request: &FetchRequest, location: &GitHubLocation) -> FetchResult {
        let unresolved = PathKeys::new("", false);
        let client = match GitHubClient::new(
            &self.config.api_base_url,
            request.token.as_deref(),
            Arc::clone(&self.transport),
            Arc::clone(&self.sleeper),
            Arc::clone(&self.clock),
            self.config.retry.clone(),
        ) {
            Ok(client) => client,
            Err(e) => return failure(request, &unresolved, Source::Api, e.to_string()),
        };

        let repo_ref = match resolve_repo_ref(&client, location) {
            Ok(repo_ref) => repo_ref,
            Err(CrawlError::Api(e)) if e.is_transient() => {
                return self.fall_back_unresolved(request, location, &e.to_string())
            }
            Err(e) => return failure(request, &unresolved, Source::Api, e.to_string()),
        };
        info!("Crawling {}", repo_ref);

        let keys = PathKeys::new(&repo_ref.subpath, request.use_relative_paths);
        let filter = request_filter(request);
        match self.remote_outcome(&client, request, &repo_ref, &filter, &keys) {
            RemoteOutcome::Success(harvest) => assemble(request, harvest, &keys, Source::Api, None),
            RemoteOutcome::Fatal { reason } => failure(request, &keys, Source::Api, reason),
            RemoteOutcome::Retryable { reason, partial } => {
                self.fall_back(request, &repo_ref, &filter, &keys, &reason, partial)
            }
        }
    }

    /// Runs the pre-check and the contents walk, tagging the outcome for the dispatcher.
    fn remote_outcome(
        &self,
        client: &GitHubClient,
        request: &FetchRequest,
        repo_ref: &RepoRef,
        filter: &PatternFilter,
        keys: &PathKeys,
    ) -> RemoteOutcome {
        let authenticated = request.token.is_some();
        match run_precheck(client, repo_ref, self.config.clone_threshold, authenticated) {
            Ok(Precheck::Walk) => {}
            Ok(Precheck::Clone { blobs }) => {
                return RemoteOutcome::Retryable {
                    reason: format!(
                        "repository has {} files, above the clone threshold of {}",
                        blobs, self.config.clone_threshold
                    ),
                    partial: Harvest::default(),
                }
            }
            Err(CrawlError::Api(e)) => {
                return RemoteOutcome::Retryable {
                    reason: e.to_string(),
                    partial: Harvest::default(),
                }
            }
            Err(e) => return RemoteOutcome::Fatal { reason: e.to_string() },
        }

        let walker = RemoteTreeWalker::new(client, repo_ref, filter, keys, request.max_file_size)
            .max_depth(self.config.max_traversal_depth)
            .authenticated(authenticated);
        match walker.walk() {
            Ok(harvest) => RemoteOutcome::Success(harvest),
            Err(WalkFailure { error, partial }) => RemoteOutcome::Retryable {
                reason: error.to_string(),
                partial,
            },
        }
    }

    /// Ref resolution failed on the API side: split the `tree/...` tail
    /// against the refs the git remote advertises, then crawl a clone.
    fn fall_back_unresolved(&self, request: &FetchRequest, location: &GitHubLocation, reason: &str) -> FetchResult {
        let mut repo_ref = RepoRef {
            owner: location.owner.clone(),
            repo: location.repo.clone(),
            git_ref: None,
            subpath: String::new(),
        };
        if let (Some(cloner), Some(tail)) = (&self.cloner, location.tree_path.as_deref()) {
            let clone_url = self.config.clone_url(&location.owner, &location.repo);
            match cloner.remote_refs(&clone_url) {
                Ok(names) => {
                    let (git_ref, subpath) = split_against_refs(&names, tail);
                    repo_ref.git_ref = Some(git_ref);
                    repo_ref.subpath = subpath;
                }
                Err(e) => {
                    let keys = PathKeys::new("", false);
                    return failure(request, &keys, Source::GitClone, e.to_string());
                }
            }
        }

        let keys = PathKeys::new(&repo_ref.subpath, request.use_relative_paths);
        let filter = request_filter(request);
        self.fall_back(request, &repo_ref, &filter, &keys, reason, Harvest::default())
    }

    /// Replaces the API results with a walk of the cached clone.
    ///
    /// Without a clone capability, or when cloning fails, whatever the API
    /// gathered is returned together with the error.
    fn fall_back(
        &self,
        request: &FetchRequest,
        repo_ref: &RepoRef,
        filter: &PatternFilter,
        keys: &PathKeys,
        reason: &str,
        partial: Harvest,
    ) -> FetchResult {
        warn!("API retrieval of {} abandoned ({}); falling back to git clone", repo_ref, reason);

        let Some(cloner) = &self.cloner else {
            let error = CrawlError::CloneUnavailable {
                context: format!(
                    "returning {} files fetched through the API ({})",
                    partial.files.len(),
                    reason
                ),
            };
            return assemble(request, partial, keys, Source::Api, Some(error.to_string()));
        };

        let clone_url = self.config.clone_url(&repo_ref.owner, &repo_ref.repo);
        let checkout = match prepare_cached_clone(
            cloner.as_ref(),
            &self.config.cache_root,
            &clone_url,
            repo_ref,
            self.config.clone_depth,
        ) {
            Ok(checkout) => checkout,
            Err(e) => return assemble(request, partial, keys, Source::GitClone, Some(e.to_string())),
        };

        let root = if repo_ref.subpath.is_empty() {
            checkout
        } else {
            checkout.join(&repo_ref.subpath)
        };
        match walk_local(&root, &repo_ref.subpath, filter, keys, request.max_file_size) {
            Ok(harvest) => assemble(request, harvest, keys, Source::GitClone, None),
            Err(e) => failure(request, keys, Source::GitClone, e.to_string()),
        }
    }
}

fn request_filter(request: &FetchRequest) -> PatternFilter {
    PatternFilter::new(request.include_patterns.as_ref(), request.exclude_patterns.as_ref())
}
