// src/filtering/patterns.rs

use glob::Pattern;
use log::warn;
use std::collections::BTreeSet;

/// Compiled include/exclude glob sets.
///
/// Matching uses shell-glob semantics (`*` also crosses `/`) and is tried against
/// both the relative key and the basename, so `*.py` matches `src/a.py` and
/// `docs/*` matches everything under `docs`.
///
/// # Examples
///
/// ```
/// use repocrawl::filtering::PatternFilter;
/// use std::collections::BTreeSet;
///
/// let include: BTreeSet<String> = ["*.py".to_string()].into();
/// let exclude: BTreeSet<String> = ["tests/*".to_string()].into();
/// let filter = PatternFilter::new(Some(&include), Some(&exclude));
///
/// assert!(filter.includes_file("src/app.py", "app.py"));
/// assert!(!filter.includes_file("tests/test_app.py", "test_app.py"));
/// assert!(!filter.includes_file("README.md", "README.md"));
/// assert!(filter.excludes_dir("tests", "tests"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternFilter {
    /// Compiles both sets. Invalid patterns are logged and dropped.
    pub fn new(include: Option<&BTreeSet<String>>, exclude: Option<&BTreeSet<String>>) -> Self {
        Self {
            include: compile(include, "include"),
            exclude: compile(exclude, "exclude"),
        }
    }

    /// File policy: no include patterns means include-by-default, and a matching
    /// exclude pattern always overrides an include match.
    pub fn includes_file(&self, path: &str, name: &str) -> bool {
        let included = self.include.is_empty() || matches_any(&self.include, path, name);
        included && !matches_any(&self.exclude, path, name)
    }

    /// Directory policy: exclude-only. The directory is also tested with a trailing
    /// slash so `vendor/*` prunes `vendor` itself.
    pub fn excludes_dir(&self, path: &str, name: &str) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        if matches_any(&self.exclude, path, name) {
            return true;
        }
        let with_slash = format!("{}/", path.trim_end_matches('/'));
        self.exclude.iter().any(|p| p.matches(&with_slash))
    }
}

fn compile(patterns: Option<&BTreeSet<String>>, kind: &str) -> Vec<Pattern> {
    patterns
        .into_iter()
        .flatten()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Invalid {} glob pattern '{}': {}", kind, p, e);
                None
            }
        })
        .collect()
}

fn matches_any(patterns: &[Pattern], path: &str, name: &str) -> bool {
    patterns.iter().any(|p| p.matches(path) || p.matches(name))
}
