// src/api/refs.rs

//! Splits a `tree/...` URL tail into a ref and a subpath.

use super::client::GitHubClient;
use crate::core_types::RepoRef;
use crate::errors::CrawlError;
use crate::git::GitHubLocation;
use log::{debug, info, warn};

/// Resolves a GitHub location into a [`RepoRef`].
///
/// Without a `tree/...` tail the ref stays `None` and the subpath is empty.
/// Otherwise the longest branch name matching the start of the tail wins; if
/// none matches, the first segment is tried as a tree SHA.
///
/// # Errors
/// `BranchLookup` when no branches could be listed, `InvalidRefPath` when the
/// tail names neither a branch nor a tree, and `Api` for transport failures.
pub fn resolve_repo_ref(client: &GitHubClient, location: &GitHubLocation) -> Result<RepoRef, CrawlError> {
    let Some(tail) = location.tree_path.as_deref() else {
        return Ok(RepoRef {
            owner: location.owner.clone(),
            repo: location.repo.clone(),
            git_ref: None,
            subpath: String::new(),
        });
    };

    let branches = client.list_branches(&location.owner, &location.repo)?;
    if branches.is_empty() {
        return Err(CrawlError::BranchLookup);
    }

    let (git_ref, subpath) = match match_branch(&branches, tail) {
        Some(found) => found,
        None => {
            let first = tail.split('/').next().unwrap_or(tail);
            debug!("No branch matches '{}', probing '{}' as a tree", tail, first);
            if client.tree_exists(&location.owner, &location.repo, first)? {
                (first.to_string(), remainder(tail, first))
            } else {
                warn!(
                    "The given path does not match any branch or tree in {}/{}",
                    location.owner, location.repo
                );
                return Err(CrawlError::InvalidRefPath);
            }
        }
    };

    info!("Using ref '{}' with path '{}'", git_ref, subpath);
    Ok(RepoRef {
        owner: location.owner.clone(),
        repo: location.repo.clone(),
        git_ref: Some(git_ref),
        subpath,
    })
}

/// Picks the longest branch that equals `tail` or prefixes it at a `/` boundary.
fn match_branch(branches: &[String], tail: &str) -> Option<(String, String)> {
    branches
        .iter()
        .filter(|name| !name.is_empty())
        .filter(|name| tail == name.as_str() || tail.starts_with(&format!("{}/", name)))
        .max_by_key(|name| name.len())
        .map(|name| (name.clone(), remainder(tail, name)))
}

/// Splits `tail` against ref names listed by a git remote: the longest matching
/// branch or tag wins, otherwise the first segment is taken as a commit.
pub(crate) fn split_against_refs(names: &[String], tail: &str) -> (String, String) {
    match_branch(names, tail).unwrap_or_else(|| {
        let first = tail.split('/').next().unwrap_or(tail);
        (first.to_string(), remainder(tail, first))
    })
}

fn remainder(tail: &str, git_ref: &str) -> String {
    tail[git_ref.len()..].trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::retry::RetryPolicy;
    use crate::api::testing::{FixedClock, RecordingSleeper, ScriptedTransport};
    use std::sync::Arc;

    const BASE: &str = "https://api.test";

    fn branches(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn location(tail: Option<&str>) -> GitHubLocation {
        GitHubLocation {
            owner: "acme".into(),
            repo: "demo".into(),
            tree_path: tail.map(str::to_string),
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> GitHubClient {
        GitHubClient::new(
            BASE,
            None,
            transport,
            Arc::new(RecordingSleeper::default()),
            Arc::new(FixedClock::at(0)),
            RetryPolicy::default(),
        )
        .unwrap()
    }

    fn branch_page(names: &[&str]) -> String {
        let items: Vec<String> = names.iter().map(|n| format!(r#"{{"name":"{}"}}"#, n)).collect();
        format!("[{}]", items.join(","))
    }

    #[test]
    fn test_longest_branch_wins() {
        let found = match_branch(&branches(&["release", "release/2.0", "main"]), "release/2.0/src");
        assert_eq!(found, Some(("release/2.0".to_string(), "src".to_string())));
    }

    #[test]
    fn test_branch_prefix_respects_segment_boundary() {
        assert_eq!(match_branch(&branches(&["ma"]), "main/src"), None);
        assert_eq!(
            match_branch(&branches(&["main"]), "main"),
            Some(("main".to_string(), String::new()))
        );
    }

    #[test]
    fn test_split_against_git_refs() {
        let names = branches(&["main", "release/2.0", "v1.0"]);
        assert_eq!(
            split_against_refs(&names, "release/2.0/docs"),
            ("release/2.0".to_string(), "docs".to_string())
        );
        assert_eq!(split_against_refs(&names, "v1.0"), ("v1.0".to_string(), String::new()));
        assert_eq!(
            split_against_refs(&names, "abc123/src/lib"),
            ("abc123".to_string(), "src/lib".to_string())
        );
    }

    #[test]
    fn test_without_tree_tail_uses_default_branch() {
        let transport = Arc::new(ScriptedTransport::default());
        let repo_ref = resolve_repo_ref(&client(transport.clone()), &location(None)).unwrap();
        assert_eq!(repo_ref.git_ref, None);
        assert_eq!(repo_ref.subpath, "");
        assert!(transport.requested().is_empty());
    }

    #[test]
    fn test_resolves_slashed_branch() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply(
            &format!("{}/repos/acme/demo/branches?per_page=100&page=1", BASE),
            200,
            branch_page(&["main", "release/2.0"]),
        );
        let repo_ref =
            resolve_repo_ref(&client(transport), &location(Some("release/2.0/src/lib"))).unwrap();
        assert_eq!(repo_ref.git_ref.as_deref(), Some("release/2.0"));
        assert_eq!(repo_ref.subpath, "src/lib");
    }

    #[test]
    fn test_falls_back_to_tree_sha() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply(
            &format!("{}/repos/acme/demo/branches?per_page=100&page=1", BASE),
            200,
            branch_page(&["main"]),
        );
        transport.reply(
            &format!("{}/repos/acme/demo/git/trees/abc123", BASE),
            200,
            r#"{"sha":"abc123","tree":[]}"#,
        );
        let repo_ref = resolve_repo_ref(&client(transport), &location(Some("abc123/docs"))).unwrap();
        assert_eq!(repo_ref.git_ref.as_deref(), Some("abc123"));
        assert_eq!(repo_ref.subpath, "docs");
    }

    #[test]
    fn test_invalid_path() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply(
            &format!("{}/repos/acme/demo/branches?per_page=100&page=1", BASE),
            200,
            branch_page(&["main"]),
        );
        let err = resolve_repo_ref(&client(transport), &location(Some("nope/src"))).unwrap_err();
        assert!(matches!(err, CrawlError::InvalidRefPath));
        assert_eq!(err.to_string(), "Invalid path in repository");
    }

    #[test]
    fn test_branch_listing_failure() {
        let transport = Arc::new(ScriptedTransport::default());
        let err = resolve_repo_ref(&client(transport), &location(Some("main/src"))).unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch branches");
    }
}
