// src/api/walker.rs

//! Iterative traversal of the contents API.
//!
//! The walk keeps an explicit LIFO stack of `(path, depth)` items instead of
//! recursing, so its depth is bounded by a constant rather than the call stack.

use super::client::{decode_json, ApiReply, FileContent, GitHubClient};
use crate::aggregate::{Harvest, PathKeys};
use crate::core_types::{EntryKind, RepoRef, SkipReason, TreeEntry};
use crate::errors::ApiError;
use crate::filtering::{decode_text, estimated_decoded_len, passes_size_filter, PatternFilter};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use serde::Deserialize;

/// The walk stopped on a transport failure or exhausted retries.
#[derive(Debug)]
pub struct WalkFailure {
    pub error: ApiError,
    /// Everything gathered before the failure.
    pub partial: Harvest,
}

/// Outcome of fetching a single file body.
enum Fetched {
    Content(Vec<u8>),
    TooLarge(u64),
    Unavailable,
}

/// The contents API answers with an array for directories and an object for files.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Many(Vec<TreeEntry>),
    One(TreeEntry),
}

/// Walks one repository subtree through the contents API.
pub struct RemoteTreeWalker<'a> {
    client: &'a GitHubClient,
    repo: &'a RepoRef,
    filter: &'a PatternFilter,
    keys: &'a PathKeys,
    max_file_size: u64,
    max_depth: usize,
    authenticated: bool,
}

impl<'a> RemoteTreeWalker<'a> {
    pub fn new(
        client: &'a GitHubClient,
        repo: &'a RepoRef,
        filter: &'a PatternFilter,
        keys: &'a PathKeys,
        max_file_size: u64,
    ) -> Self {
        Self {
            client,
            repo,
            filter,
            keys,
            max_file_size,
            max_depth: crate::constants::MAX_TRAVERSAL_DEPTH,
            authenticated: false,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Runs the walk from the repository subpath.
    ///
    /// 404s, unexpected statuses and undecodable bodies are logged per item and
    /// the walk continues. Rate-limited listings are waited out and the same
    /// item is pushed again.
    ///
    /// # Errors
    /// Returns a [`WalkFailure`] carrying the partial harvest when a request
    /// fails at the transport level or exhausts its retries.
    pub fn walk(&self) -> Result<Harvest, WalkFailure> {
        let mut harvest = Harvest::default();
        let mut stack: Vec<(String, usize)> = vec![(self.repo.subpath.clone(), 0)];

        while let Some((path, depth)) = stack.pop() {
            if depth > self.max_depth {
                warn!("Skipping {}: exceeds max depth {}", path, self.max_depth);
                continue;
            }

            let entries = match self.list(&path) {
                Ok(Some(Listed::Entries(entries))) => entries,
                Ok(Some(Listed::RateLimited)) => {
                    stack.push((path, depth));
                    continue;
                }
                Ok(None) => continue,
                Err(error) => return Err(WalkFailure { error, partial: harvest }),
            };

            for entry in entries {
                if entry.path.is_empty() {
                    continue;
                }
                let key = self.keys.key_for(&entry.path);
                match entry.kind {
                    EntryKind::Dir => {
                        if self.filter.excludes_dir(&key, entry.basename()) {
                            info!("Skipping directory {}: matches exclude patterns", key);
                            continue;
                        }
                        stack.push((entry.path, depth + 1));
                    }
                    EntryKind::File => {
                        if let Err(error) = self.process_file(&entry, key, &mut harvest) {
                            return Err(WalkFailure { error, partial: harvest });
                        }
                    }
                    EntryKind::Other => debug!("Skipping {}: not a regular file", key),
                }
            }
        }

        Ok(harvest)
    }

    /// Lists one directory. `Ok(None)` means "logged, move on".
    fn list(&self, path: &str) -> Result<Option<Listed>, ApiError> {
        let url = self.client.contents_url(
            &self.repo.owner,
            &self.repo.repo,
            path,
            self.repo.git_ref.as_deref(),
        )?;

        match self.client.send(url.as_str())? {
            ApiReply::Ok(response) => match decode_json::<Listing>(url.as_str(), response) {
                Ok(Listing::Many(entries)) => Ok(Some(Listed::Entries(entries))),
                Ok(Listing::One(entry)) => Ok(Some(Listed::Entries(vec![entry]))),
                Err(e) if e.is_transient() => Err(e),
                Err(e) => {
                    warn!("Error parsing response for '{}': {}", path, e);
                    Ok(None)
                }
            },
            ApiReply::RateLimited { wait } => {
                warn!("Rate limit exceeded. Waiting for {} seconds...", wait.as_secs());
                self.client.sleeper().sleep(wait);
                Ok(Some(Listed::RateLimited))
            }
            ApiReply::NotFound => {
                warn!(
                    "{}",
                    not_found_message(self.authenticated, path, self.repo.git_ref.as_deref())
                );
                Ok(None)
            }
            ApiReply::Status { status, body } => {
                warn!("Error fetching '{}': {} - {}", path, status, body);
                Ok(None)
            }
        }
    }

    fn process_file(&self, entry: &TreeEntry, key: String, harvest: &mut Harvest) -> Result<(), ApiError> {
        if !self.filter.includes_file(&key, entry.basename()) {
            info!("Skipping {}: Does not match include/exclude patterns", key);
            harvest.skip(key, entry.size, SkipReason::Excluded);
            return Ok(());
        }
        if !passes_size_filter(entry.size, self.max_file_size) {
            info!(
                "Skipping {}: File size ({} bytes) exceeds limit ({} bytes)",
                key, entry.size, self.max_file_size
            );
            harvest.skip(key, entry.size, SkipReason::Oversize);
            return Ok(());
        }

        let fetched = match &entry.download_url {
            Some(url) => self.download(url, &key)?,
            None => self.fetch_encoded(entry, &key)?,
        };

        match fetched {
            Fetched::Content(bytes) => match decode_text(&bytes) {
                Some(text) => {
                    info!("Downloaded: {} ({} bytes)", key, bytes.len());
                    harvest.add_file(key, text);
                }
                None => info!("Skipping {}: not UTF-8 text", key),
            },
            Fetched::TooLarge(size) => {
                info!(
                    "Skipping {}: Content length ({} bytes) exceeds limit ({} bytes)",
                    key, size, self.max_file_size
                );
                harvest.skip(key, size, SkipReason::Oversize);
            }
            Fetched::Unavailable => {}
        }
        Ok(())
    }

    /// Fetches a raw file, re-checking the live `Content-Length` before reading.
    fn download(&self, url: &str, key: &str) -> Result<Fetched, ApiError> {
        let response = match self.client.send_waiting(url)? {
            ApiReply::Ok(response) => response,
            ApiReply::NotFound => {
                warn!("Failed to download {}: 404", key);
                return Ok(Fetched::Unavailable);
            }
            ApiReply::Status { status, .. } => {
                warn!("Failed to download {}: {}", key, status);
                return Ok(Fetched::Unavailable);
            }
            ApiReply::RateLimited { .. } => return Ok(Fetched::Unavailable),
        };

        if let Some(length) = response.content_length() {
            if !passes_size_filter(length, self.max_file_size) {
                return Ok(Fetched::TooLarge(length));
            }
        }
        // No (or a lying) Content-Length: never read past the limit.
        match response.read_limited(self.max_file_size) {
            Ok(Some(bytes)) => Ok(Fetched::Content(bytes)),
            Ok(None) => Ok(Fetched::TooLarge(self.max_file_size.saturating_add(1))),
            Err(e) => Err(ApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Fetches a file through the contents endpoint and decodes its base64 payload.
    fn fetch_encoded(&self, entry: &TreeEntry, key: &str) -> Result<Fetched, ApiError> {
        let url = match &entry.url {
            Some(url) => url.clone(),
            None => self
                .client
                .contents_url(
                    &self.repo.owner,
                    &self.repo.repo,
                    &entry.path,
                    self.repo.git_ref.as_deref(),
                )?
                .to_string(),
        };

        let response = match self.client.send_waiting(&url)? {
            ApiReply::Ok(response) => response,
            ApiReply::NotFound | ApiReply::RateLimited { .. } => {
                warn!("Failed to get content for {}", key);
                return Ok(Fetched::Unavailable);
            }
            ApiReply::Status { status, .. } => {
                warn!("Failed to get content for {}: {}", key, status);
                return Ok(Fetched::Unavailable);
            }
        };

        let payload: FileContent = match decode_json(&url, response) {
            Ok(payload) => payload,
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                warn!("{}", e);
                return Ok(Fetched::Unavailable);
            }
        };

        match (payload.encoding.as_deref(), payload.content) {
            (Some("base64"), Some(content)) => {
                let estimated = estimated_decoded_len(&content);
                if !passes_size_filter(estimated, self.max_file_size) {
                    return Ok(Fetched::TooLarge(estimated));
                }
                let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                match STANDARD.decode(compact) {
                    Ok(bytes) => Ok(Fetched::Content(bytes)),
                    Err(source) => {
                        warn!(
                            "{}",
                            ApiError::Base64 {
                                path: key.to_string(),
                                source
                            }
                        );
                        Ok(Fetched::Unavailable)
                    }
                }
            }
            _ => {
                warn!("Unexpected content format for {}", key);
                Ok(Fetched::Unavailable)
            }
        }
    }
}

enum Listed {
    Entries(Vec<TreeEntry>),
    RateLimited,
}

/// Explains a 404 on a contents listing from what is known about the request.
pub fn not_found_message(authenticated: bool, path: &str, git_ref: Option<&str>) -> String {
    if !authenticated {
        "Error 404: Repository not found or is private. If this is a private repository, \
         provide a GitHub token via --token or the GITHUB_TOKEN environment variable."
            .to_string()
    } else if path.is_empty() && git_ref == Some("main") {
        "Error 404: Repository not found. Check if the default branch is not 'main'; \
         try adding the branch name to the URL, e.g. .../tree/master"
            .to_string()
    } else {
        format!(
            "Error 404: Path '{}' not found in repository or insufficient permissions with the provided token.",
            path
        )
    }
}
