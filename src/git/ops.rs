// src/git/ops.rs
//! The `git2`-backed clone capability.

use super::RepoCloner;
use crate::errors::GitError;
use crate::progress::ProgressReporter;
use anyhow::Context;
use git2::{Cred, Direction, FetchOptions, Remote, RemoteCallbacks, Repository, ResetType};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Clones and updates repositories with libgit2.
#[derive(Clone, Default)]
pub struct Git2Cloner {
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl Git2Cloner {
    pub fn new(progress: Option<Arc<dyn ProgressReporter>>) -> Self {
        Self { progress }
    }
}

impl RepoCloner for Git2Cloner {
    fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
        branch: Option<&str>,
        depth: Option<u32>,
    ) -> Result<(), GitError> {
        info!("Cloning {} into {}", url, dest.display());
        let existed = dest.exists();
        let clone_failed = |e: git2::Error| GitError::CloneFailed {
            url: url.to_string(),
            source: Box::new(e),
        };

        let cloned = Repository::init(dest).map_err(clone_failed).and_then(|repo| {
            let remote_ref = {
                let mut remote = repo.remote("origin", url).map_err(clone_failed)?;
                let remote_ref = select_remote_ref(&mut remote, branch).map_err(clone_failed)?;
                let mut fetch_options = create_fetch_options(depth, self.progress.clone());
                remote
                    .fetch(&[refspec_for(&remote_ref)], Some(&mut fetch_options), None)
                    .map_err(clone_failed)?;
                remote_ref
            };
            if let Some(p) = &self.progress {
                p.finish_with_message("Clone complete.".to_string());
            }
            let commit = resolve_commit(&repo, &remote_ref, branch)?;
            checkout_detached(&repo, &commit)
        });

        if cloned.is_err() && !existed {
            // A half-initialized repository would be mistaken for a cache hit.
            let _ = std::fs::remove_dir_all(dest);
        }
        cloned
    }

    fn update_repo(&self, dest: &Path, branch: Option<&str>, depth: Option<u32>) -> Result<(), GitError> {
        info!("Updating cached repository at {}", dest.display());
        let repo = Repository::open(dest).map_err(|e| GitError::UpdateFailed(e.to_string()))?;
        let fetch_failed = |e: git2::Error| GitError::FetchFailed {
            remote: "origin".to_string(),
            source: Box::new(e),
        };

        let remote_ref = {
            let mut remote = repo.find_remote("origin").map_err(fetch_failed)?;
            let remote_ref = select_remote_ref(&mut remote, branch).map_err(fetch_failed)?;
            let mut fetch_options = create_fetch_options(depth, self.progress.clone());
            remote
                .fetch(&[refspec_for(&remote_ref)], Some(&mut fetch_options), None)
                .map_err(fetch_failed)?;
            remote_ref
        };
        if let Some(p) = &self.progress {
            p.finish_with_message("Update complete.".to_string());
        }

        // The cache is read-only, so resetting to the fetched tip is the
        // fast-forward; a shallow history cannot prove ancestry anyway.
        let commit = resolve_commit(&repo, &remote_ref, branch)?;
        checkout_detached(&repo, &commit)?;
        info!("Cached repository updated.");
        Ok(())
    }

    fn is_repo(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    fn remote_refs(&self, url: &str) -> Result<Vec<String>, GitError> {
        debug!("Listing refs of {}", url);
        let listing_failed = |e: git2::Error| GitError::FetchFailed {
            remote: url.to_string(),
            source: Box::new(e),
        };
        let mut remote = Remote::create_detached(url).map_err(listing_failed)?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(create_remote_callbacks(None)), None)
            .map_err(listing_failed)?;
        let names = connection
            .list()
            .map_err(listing_failed)?
            .iter()
            .filter_map(|head| {
                let name = head.name();
                name.strip_prefix("refs/heads/")
                    .or_else(|| name.strip_prefix("refs/tags/"))
            })
            .filter(|name| !name.ends_with("^{}"))
            .map(str::to_string)
            .collect();
        Ok(names)
    }
}

fn checkout_detached(repo: &Repository, commit: &git2::Commit<'_>) -> Result<(), GitError> {
    repo.set_head_detached(commit.id())
        .context("Failed to detach HEAD")
        .map_err(|e| GitError::UpdateFailed(e.to_string()))?;
    repo.reset(commit.as_object(), ResetType::Hard, None)
        .context("Failed to reset the working tree")
        .map_err(|e| GitError::UpdateFailed(e.to_string()))?;
    Ok(())
}

fn default_ssh_key() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".ssh")
        .join("id_rsa")
}

/// Sets up remote callbacks for authentication and progress reporting.
fn create_remote_callbacks(progress: Option<Arc<dyn ProgressReporter>>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();

    // Authentication: SSH agent first, then the default key path.
    callbacks.credentials(|_url, username_from_url, _allowed_types| {
        let username = username_from_url.unwrap_or("git");
        debug!("Attempting SSH authentication for user: {}", username);

        if let Ok(cred) = Cred::ssh_key_from_agent(username) {
            debug!("Authenticated via SSH agent");
            return Ok(cred);
        }
        if let Ok(cred) = Cred::ssh_key(username, None, &default_ssh_key(), None) {
            debug!("Authenticated via default SSH key path");
            return Ok(cred);
        }

        warn!("SSH authentication failed: No agent or default keys found.");
        Err(git2::Error::from_str(
            "Authentication failed: could not connect with SSH agent or default keys",
        ))
    });

    if let Some(p) = progress {
        callbacks.transfer_progress(move |stats| {
            if stats.received_objects() == stats.total_objects() {
                p.set_length(stats.total_deltas() as u64);
                p.set_position(stats.indexed_deltas() as u64);
                p.set_message("Resolving deltas...".to_string());
            } else if stats.total_objects() > 0 {
                p.set_length(stats.total_objects() as u64);
                p.set_position(stats.received_objects() as u64);
                p.set_message("Receiving objects...".to_string());
            }
            true
        });
    }

    callbacks
}

fn create_fetch_options(
    depth: Option<u32>,
    progress: Option<Arc<dyn ProgressReporter>>,
) -> FetchOptions<'static> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(create_remote_callbacks(progress));
    fetch_options.prune(git2::FetchPrune::On);
    // Never follow redirects to another protocol or host.
    fetch_options.follow_redirects(git2::RemoteRedirect::None);
    // Only the selected ref is fetched; a requested tag is named in the refspec.
    fetch_options.download_tags(git2::AutotagOption::None);
    if let Some(depth) = depth {
        fetch_options.depth(depth as i32);
        debug!("Set shallow clone depth to: {}", depth);
    }
    fetch_options
}

/// Picks the one remote ref to fetch: the branch or tag named `requested`,
/// or the remote's default branch. A requested name that is neither is looked
/// up as a commit in the default branch's history afterwards.
fn select_remote_ref(remote: &mut Remote<'_>, requested: Option<&str>) -> Result<String, git2::Error> {
    let connection = remote.connect_auth(Direction::Fetch, Some(create_remote_callbacks(None)), None)?;
    if let Some(name) = requested {
        let candidates = [format!("refs/heads/{}", name), format!("refs/tags/{}", name)];
        let heads = connection.list()?;
        if let Some(found) = candidates
            .into_iter()
            .find(|candidate| heads.iter().any(|head| head.name() == candidate.as_str()))
        {
            debug!("Resolved '{}' as {}", name, found);
            return Ok(found);
        }
        debug!("'{}' is neither a branch nor a tag; fetching the default branch", name);
    }
    match connection.default_branch() {
        Ok(default_branch) => default_branch
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| git2::Error::from_str("remote default branch name is not valid UTF-8")),
        Err(err) => {
            // Remotes that do not advertise HEAD's target: pick the branch HEAD points at.
            let heads = connection.list()?;
            let head_oid = heads.iter().find(|head| head.name() == "HEAD").map(|head| head.oid());
            heads
                .iter()
                .find(|head| head.name().starts_with("refs/heads/") && Some(head.oid()) == head_oid)
                .map(|head| head.name().to_string())
                .ok_or(err)
        }
    }
}

/// Refspec fetching `remote_ref` alone.
fn refspec_for(remote_ref: &str) -> String {
    format!("+{}:{}", remote_ref, local_ref_for(remote_ref))
}

/// Where a fetched remote ref is stored: branches under `refs/remotes/origin/`,
/// tags under their own name.
fn local_ref_for(remote_ref: &str) -> String {
    match remote_ref.strip_prefix("refs/heads/") {
        Some(branch) => format!("refs/remotes/origin/{}", branch),
        None => remote_ref.to_string(),
    }
}

/// Finds the commit to check out after fetching `remote_ref`.
fn resolve_commit<'a>(
    repo: &'a Repository,
    remote_ref: &str,
    requested: Option<&str>,
) -> Result<git2::Commit<'a>, GitError> {
    if let Some(name) = requested {
        let fetched_by_name =
            remote_ref == format!("refs/heads/{}", name) || remote_ref == format!("refs/tags/{}", name);
        if !fetched_by_name {
            // A commit SHA that happens to be present in the fetched history.
            return repo
                .revparse_single(name)
                .and_then(|object| object.peel_to_commit())
                .map_err(|_| GitError::RefNotFound {
                    name: name.to_string(),
                });
        }
    }

    let local_ref = local_ref_for(remote_ref);
    // Handles branches, lightweight tags and annotated tags alike.
    repo.find_reference(&local_ref)
        .and_then(|r| r.peel_to_commit())
        .map_err(|e| GitError::DefaultBranchResolution(format!("'{}' missing after fetch: {}", local_ref, e)))
}
