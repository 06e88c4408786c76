use crate::aggregate::PathKeys;
use crate::filtering::PatternFilter;
use ignore::{DirEntry, Walk, WalkBuilder};
use log::debug;
use std::path::{Path, PathBuf};

/// Joins the path of `entry` below `root` into a forward-slash repository path.
pub(super) fn repo_path_of(root: &Path, prefix: &str, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = Vec::new();
    if !prefix.is_empty() {
        parts.push(prefix.to_string());
    }
    for component in relative.components() {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    Some(parts.join("/"))
}

/// Configures a walker over `root` that sees every file (no ignore files, no
/// hidden-file rules) and prunes `.git` plus directories the filter excludes.
pub(super) fn build_walker(root: &Path, prefix: &str, filter: &PatternFilter, keys: &PathKeys) -> Walk {
    let mut walker_builder = WalkBuilder::new(root);
    walker_builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let root: PathBuf = root.to_path_buf();
    let prefix = prefix.to_string();
    let filter = filter.clone();
    let keys = keys.clone();
    walker_builder.filter_entry(move |entry: &DirEntry| {
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if name == ".git" {
            return false;
        }
        let Some(repo_path) = repo_path_of(&root, &prefix, entry.path()) else {
            return true;
        };
        let key = keys.key_for(&repo_path);
        if filter.excludes_dir(&key, &name) {
            debug!("Pruning directory {}: matches exclude patterns", key);
            return false;
        }
        true
    });

    walker_builder.build()
}
