// src/api/precheck.rs

//! Decides, before any per-directory traffic, whether the API walk is worth it.

use super::client::{GitHubClient, RepoLookup};
use crate::core_types::RepoRef;
use crate::errors::CrawlError;
use log::{info, warn};

/// What the dispatcher should do after the pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    /// Walk the contents API.
    Walk,
    /// The tree is too large; clone instead.
    Clone { blobs: usize },
}

/// Checks that the repository exists and counts the blobs of the ref to crawl.
///
/// Statuses other than 200/404 on the repository lookup skip the count and
/// walk anyway. Non-transient failures (for example an undecodable body) are
/// logged and also treated as "walk".
///
/// # Errors
/// `RepositoryNotFound` on a 404, and `Api` for transport failures or
/// exhausted retries.
pub fn run_precheck(
    client: &GitHubClient,
    repo_ref: &RepoRef,
    threshold: usize,
    authenticated: bool,
) -> Result<Precheck, CrawlError> {
    match count_tree(client, repo_ref, threshold, authenticated) {
        Err(CrawlError::Api(e)) if !e.is_transient() => {
            warn!("Pre-check for {} failed, continuing with the API walk: {}", repo_ref, e);
            Ok(Precheck::Walk)
        }
        other => other,
    }
}

fn count_tree(
    client: &GitHubClient,
    repo_ref: &RepoRef,
    threshold: usize,
    authenticated: bool,
) -> Result<Precheck, CrawlError> {
    let default_branch = match client.get_repository(&repo_ref.owner, &repo_ref.repo)? {
        RepoLookup::Found { default_branch } => default_branch,
        RepoLookup::NotFound => {
            let hint = if authenticated {
                "Verify the repository exists and the token has access to it."
            } else {
                "If this is a private repository, provide a GitHub token."
            };
            return Err(CrawlError::RepositoryNotFound {
                owner: repo_ref.owner.clone(),
                repo: repo_ref.repo.clone(),
                hint: hint.to_string(),
            });
        }
        RepoLookup::Unavailable { status } => {
            warn!("Repository lookup returned HTTP {}, skipping pre-check", status);
            return Ok(Precheck::Walk);
        }
    };

    let Some(git_ref) = repo_ref.git_ref.clone().or(default_branch) else {
        return Ok(Precheck::Walk);
    };

    match client.count_blobs(&repo_ref.owner, &repo_ref.repo, &git_ref)? {
        Some(blobs) if blobs > threshold => {
            info!(
                "Repository file count {} exceeds threshold {}; falling back to git clone",
                blobs, threshold
            );
            Ok(Precheck::Clone { blobs })
        }
        Some(blobs) => {
            info!("Repository has {} files at '{}'", blobs, git_ref);
            Ok(Precheck::Walk)
        }
        None => Ok(Precheck::Walk),
    }
}
