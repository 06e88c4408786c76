//! Walks a directory on disk with the same filter and size gate as the API walk.
//!
//! Every clone branch (cached fallback, ephemeral SSH clone) and local-path
//! sources end up here.

use crate::aggregate::{Harvest, PathKeys};
use crate::core_types::SkipReason;
use crate::errors::{io_error_with_path, CrawlError};
use crate::filtering::{decode_text, passes_size_filter, PatternFilter};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

mod walker;

use walker::{build_walker, repo_path_of};

/// Collects files below `root`.
///
/// `prefix` is the repository path `root` corresponds to (empty for the
/// repository root); it is prepended before keys are computed so the output
/// matches what the API walk would produce for the same subpath.
///
/// Unreadable entries and non-UTF-8 files are logged and left out. Nothing is
/// read from a file that fails the pattern or size checks.
///
/// # Errors
/// Returns `SubpathMissing` when `root` does not exist.
///
/// # Examples
///
/// ```
/// use repocrawl::aggregate::PathKeys;
/// use repocrawl::discovery::walk_local;
/// use repocrawl::filtering::PatternFilter;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// std::fs::write(dir.path().join("main.py"), "print('hi')")?;
/// std::fs::write(dir.path().join("big.txt"), "x".repeat(100))?;
///
/// let harvest = walk_local(
///     dir.path(),
///     "",
///     &PatternFilter::default(),
///     &PathKeys::new("", false),
///     50,
/// )?;
/// assert_eq!(harvest.files["main.py"], "print('hi')");
/// assert_eq!(harvest.skipped().next().map(|s| s.path.as_str()), Some("big.txt"));
/// # Ok(())
/// # }
/// ```
pub fn walk_local(
    root: &Path,
    prefix: &str,
    filter: &PatternFilter,
    keys: &PathKeys,
    max_file_size: u64,
) -> Result<Harvest, CrawlError> {
    if !root.exists() {
        return Err(CrawlError::SubpathMissing(prefix.to_string()));
    }

    let mut harvest = Harvest::default();
    for result in build_walker(root, prefix, filter, keys) {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Some(repo_path) = repo_path_of(root, prefix, entry.path()) else {
            continue;
        };
        if repo_path.is_empty() {
            continue;
        }
        let key = keys.key_for(&repo_path);
        let name = entry.file_name().to_string_lossy();

        if !filter.includes_file(&key, &name) {
            info!("Skipping {}: Does not match include/exclude patterns", key);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            harvest.skip(key, size, SkipReason::Excluded);
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Failed to stat {}: {}", key, e);
                continue;
            }
        };
        if !passes_size_filter(size, max_file_size) {
            info!(
                "Skipping {}: File size ({} bytes) exceeds limit ({} bytes)",
                key, size, max_file_size
            );
            harvest.skip(key, size, SkipReason::Oversize);
            continue;
        }

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {}: {}", key, io_error_with_path(e, entry.path()));
                continue;
            }
        };
        match decode_text(&bytes) {
            Some(text) => {
                info!("Added: {} ({} bytes)", key, size);
                harvest.add_file(key, text);
            }
            None => debug!("Skipping {}: not UTF-8 text", key),
        }
    }

    Ok(harvest)
}
