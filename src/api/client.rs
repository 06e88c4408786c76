// src/api/client.rs

//! GitHub REST endpoints used by the crawler.

use super::retry::{is_rate_limited, rate_limit_wait, with_backoff, Clock, RetryPolicy, Sleeper};
use super::transport::{HttpResponse, HttpTransport};
use crate::constants::{BRANCHES_PER_PAGE, GITHUB_ACCEPT, MAX_BRANCH_PAGES, RETRYABLE_STATUS_CODES};
use crate::errors::ApiError;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Largest error body kept for messages and rate-limit detection.
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// A response after transient retries, classified for the caller.
#[derive(Debug)]
pub enum ApiReply {
    /// Any 2xx response, body still unread.
    Ok(HttpResponse),
    NotFound,
    /// 403 "rate limit exceeded". The request should be re-issued after `wait`.
    RateLimited { wait: Duration },
    /// Any other status.
    Status { status: u16, body: String },
}

/// Result of `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoLookup {
    Found { default_branch: Option<String> },
    NotFound,
    /// Neither 200 nor 404. The pre-check is skipped.
    Unavailable { status: u16 },
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct BranchInfo {
    name: String,
}

#[derive(Deserialize)]
struct TreeListing {
    #[serde(default)]
    tree: Vec<TreeListingEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeListingEntry {
    #[serde(rename = "type")]
    kind: String,
}

/// The payload of a single-file contents response.
#[derive(Debug, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Authenticated access to one GitHub API host.
///
/// The credential is owned by the client instance; nothing is stored globally.
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    api_base: Url,
    headers: HeaderMap,
}

impl GitHubClient {
    pub fn new(
        api_base_url: &str,
        token: Option<&str>,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let api_base = Url::parse(api_base_url).map_err(|source| ApiError::InvalidUrl {
            url: api_base_url.to_string(),
            source,
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: api_base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
                ApiError::Transport {
                    url: api_base_url.to_string(),
                    message: "token contains characters not allowed in a header".to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            debug!("Using a GitHub token for authentication.");
        }

        Ok(Self {
            transport,
            sleeper,
            clock,
            retry,
            api_base,
            headers,
        })
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Builds `{api_base}/repos/{owner}/{repo}/{segments...}`.
    ///
    /// Segments containing `/` are split so nested paths stay unescaped.
    pub fn repo_endpoint(&self, owner: &str, repo: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl {
                url: self.api_base.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?;
            path.pop_if_empty().extend(["repos", owner, repo]);
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }

    /// GETs `url`, retrying transport failures and 429/5xx with backoff, then
    /// classifies the final response.
    pub fn send(&self, url: &str) -> Result<ApiReply, ApiError> {
        debug!("GET {}", url);
        let response = with_backoff(&self.retry, self.sleeper.clone(), url, || {
            let response = self.transport.get(url, &self.headers)?;
            if RETRYABLE_STATUS_CODES.contains(&response.status) {
                return Err(ApiError::RetryableStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            Ok(response)
        })?;
        self.classify(url, response)
    }

    /// Like [`send`](Self::send), but waits out rate limits and re-issues the request.
    pub fn send_waiting(&self, url: &str) -> Result<ApiReply, ApiError> {
        loop {
            match self.send(url)? {
                ApiReply::RateLimited { wait } => {
                    warn!("Rate limit exceeded. Waiting for {} seconds...", wait.as_secs());
                    self.sleeper.sleep(wait);
                }
                reply => return Ok(reply),
            }
        }
    }

    fn classify(&self, url: &str, response: HttpResponse) -> Result<ApiReply, ApiError> {
        if response.is_success() {
            return Ok(ApiReply::Ok(response));
        }
        let status = response.status;
        if status == 404 {
            return Ok(ApiReply::NotFound);
        }
        let reset = response.header("x-ratelimit-reset").map(str::to_owned);
        let body = read_error_body(url, response)?;
        if is_rate_limited(status, &body) {
            let wait = rate_limit_wait(reset.as_deref(), self.clock.now_unix());
            return Ok(ApiReply::RateLimited { wait });
        }
        Ok(ApiReply::Status { status, body })
    }

    /// `GET /repos/{owner}/{repo}`.
    pub fn get_repository(&self, owner: &str, repo: &str) -> Result<RepoLookup, ApiError> {
        let url = self.repo_endpoint(owner, repo, &[])?;
        match self.send_waiting(url.as_str())? {
            ApiReply::Ok(response) => {
                let info: RepoInfo = decode_json(url.as_str(), response)?;
                Ok(RepoLookup::Found {
                    default_branch: info.default_branch,
                })
            }
            ApiReply::NotFound => Ok(RepoLookup::NotFound),
            ApiReply::Status { status, .. } => Ok(RepoLookup::Unavailable { status }),
            ApiReply::RateLimited { .. } => Ok(RepoLookup::Unavailable { status: 403 }),
        }
    }

    /// All branch names, following pagination up to a fixed page cap.
    ///
    /// A non-200 page ends the listing with whatever was collected so far.
    pub fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        let mut names = Vec::new();
        for page in 1..=MAX_BRANCH_PAGES {
            let mut url = self.repo_endpoint(owner, repo, &["branches"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &BRANCHES_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let branches: Vec<BranchInfo> = match self.send_waiting(url.as_str())? {
                ApiReply::Ok(response) => decode_json(url.as_str(), response)?,
                ApiReply::NotFound => {
                    warn!("Error 404: Repository {}/{} not found or is private.", owner, repo);
                    break;
                }
                ApiReply::Status { status, body } => {
                    warn!(
                        "Error fetching the branches of {}/{}: {} - {}",
                        owner, repo, status, body
                    );
                    break;
                }
                ApiReply::RateLimited { .. } => break,
            };
            let page_len = branches.len();
            names.extend(branches.into_iter().map(|b| b.name));
            if page_len < BRANCHES_PER_PAGE {
                break;
            }
        }
        Ok(names)
    }

    /// Whether `GET /git/trees/{sha}` answers 200.
    pub fn tree_exists(&self, owner: &str, repo: &str, sha: &str) -> Result<bool, ApiError> {
        let url = self.repo_endpoint(owner, repo, &["git", "trees", sha])?;
        Ok(matches!(self.send_waiting(url.as_str())?, ApiReply::Ok(_)))
    }

    /// Counts `blob` entries of the recursive tree listing of `git_ref`.
    ///
    /// Returns `None` when the listing is not available.
    pub fn count_blobs(&self, owner: &str, repo: &str, git_ref: &str) -> Result<Option<usize>, ApiError> {
        let mut url = self.repo_endpoint(owner, repo, &["git", "trees"])?;
        // The ref is a single segment even when it contains slashes.
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(git_ref);
        }
        url.query_pairs_mut().append_pair("recursive", "1");

        match self.send_waiting(url.as_str())? {
            ApiReply::Ok(response) => {
                let listing: TreeListing = decode_json(url.as_str(), response)?;
                if listing.truncated {
                    warn!("Tree listing for {}/{}@{} is truncated", owner, repo, git_ref);
                }
                Ok(Some(listing.tree.iter().filter(|e| e.kind == "blob").count()))
            }
            _ => Ok(None),
        }
    }

    /// The contents endpoint URL for `path` at `git_ref`.
    pub fn contents_url(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Url, ApiError> {
        let mut url = self.repo_endpoint(owner, repo, &["contents", path])?;
        if let Some(git_ref) = git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        Ok(url)
    }
}

/// Reads and deserializes a successful JSON body.
pub fn decode_json<T: DeserializeOwned>(url: &str, response: HttpResponse) -> Result<T, ApiError> {
    let text = response.read_text().map_err(|e| ApiError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

fn read_error_body(url: &str, response: HttpResponse) -> Result<String, ApiError> {
    let bytes = response
        .read_limited(ERROR_BODY_LIMIT)
        .map_err(|e| ApiError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?
        .unwrap_or_default();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
