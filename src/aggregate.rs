// src/aggregate.rs

//! Collects per-branch results and wraps them into the uniform [`FetchResult`].

use crate::core_types::{FetchRequest, FetchResult, FetchStats, SkipReason, SkipRecord, Source};
use std::collections::BTreeMap;

/// Maps repository-root paths to output keys.
///
/// With relative paths enabled and a non-empty subpath, keys are relative to the
/// subpath. Otherwise they are relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKeys {
    prefix: Option<String>,
}

impl PathKeys {
    pub fn new(subpath: &str, use_relative_paths: bool) -> Self {
        let subpath = subpath.trim_matches('/');
        let prefix = (use_relative_paths && !subpath.is_empty()).then(|| subpath.to_string());
        Self { prefix }
    }

    /// Output key for a path given from the repository root.
    pub fn key_for(&self, repo_path: &str) -> String {
        let repo_path = repo_path.trim_start_matches('/');
        let Some(prefix) = &self.prefix else {
            return repo_path.to_string();
        };
        match repo_path.strip_prefix(prefix.as_str()) {
            // The subpath names a single file.
            Some("") => repo_path.rsplit('/').next().unwrap_or(repo_path).to_string(),
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
            _ => repo_path.to_string(),
        }
    }

    /// The `basePath` reported in stats.
    pub fn base_path(&self) -> Option<String> {
        self.prefix.clone()
    }
}

/// Files and skip records gathered by one retrieval branch.
///
/// A key is never present in both `files` and the skip records; the latest
/// decision wins. Skip records are kept by key and reported in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    pub files: BTreeMap<String, String>,
    skipped: BTreeMap<String, SkipRecord>,
}

impl Harvest {
    pub fn add_file(&mut self, key: String, content: String) {
        self.skipped.remove(&key);
        self.files.insert(key, content);
    }

    pub fn skip(&mut self, key: String, size: u64, reason: SkipReason) {
        self.files.remove(&key);
        let record = SkipRecord {
            path: key.clone(),
            size,
            reason,
        };
        self.skipped.insert(key, record);
    }

    pub fn skipped(&self) -> impl ExactSizeIterator<Item = &SkipRecord> {
        self.skipped.values()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.skipped.is_empty()
    }
}

/// How the hosted-API branch ended. The dispatcher picks fallback from the tag alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Success(Harvest),
    /// Transport failure, exhausted retries, or a proactive decision to clone.
    Retryable { reason: String, partial: Harvest },
    /// Nothing else should be tried for this call.
    Fatal { reason: String },
}

/// Wraps a harvest into the public result shape.
pub fn assemble(
    request: &FetchRequest,
    harvest: Harvest,
    keys: &PathKeys,
    source: Source,
    error: Option<String>,
) -> FetchResult {
    let Harvest { files, skipped } = harvest;
    let skipped: Vec<SkipRecord> = skipped.into_values().collect();
    FetchResult {
        stats: FetchStats {
            downloaded_count: files.len(),
            skipped_count: skipped.len(),
            skipped_files: skipped,
            base_path: keys.base_path(),
            include_patterns: request.include_patterns.clone(),
            exclude_patterns: request.exclude_patterns.clone(),
            source,
            error,
        },
        files,
    }
}

/// A result with no files and `error` set.
pub fn failure(request: &FetchRequest, keys: &PathKeys, source: Source, error: String) -> FetchResult {
    assemble(request, Harvest::default(), keys, source, Some(error))
}
