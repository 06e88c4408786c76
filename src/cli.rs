// src/cli.rs

use clap::Parser;

/// Turns a GitHub URL, a git clone URL or a local directory into a JSON map of
/// file contents.
///
/// Public GitHub trees are walked through the REST API with retries and
/// rate-limit waits. Large repositories, exhausted retries and `git@`/`.git`
/// sources are cloned instead.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// GitHub URL (https://github.com/owner/repo[/tree/ref/path]), API URL,
    /// git@/.git clone URL, or local directory.
    pub source: String,

    /// GitHub token. Unauthenticated requests are heavily rate-limited.
    #[arg(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    // --- Filtering Options ---
    /// Maximum file size to include (e.g., "100k", "1MiB"). Larger files are skipped.
    #[arg(short = 'm', long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Include only files matching these glob patterns (repeatable).
    #[arg(short = 'i', long = "include", value_name = "GLOB", num_args = 1..)]
    pub include_patterns: Option<Vec<String>>,

    /// Exclude files and prune directories matching these glob patterns (repeatable).
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", num_args = 1..)]
    pub exclude_patterns: Option<Vec<String>>,

    /// Key files relative to the requested subdirectory instead of the repository root.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub relative: bool,

    // --- Remote Options ---
    /// Directory for cached fallback clones.
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<String>,

    /// Base URL of the GitHub REST API.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Base URL used to build fallback clone URLs.
    #[arg(long, value_name = "URL")]
    pub clone_url: Option<String>,

    /// Maximum directory depth walked through the API.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Clone instead of walking when the repository has more blobs than this.
    #[arg(long, value_name = "N")]
    pub clone_threshold: Option<usize>,

    /// Clone with full history instead of a shallow clone.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub full_clone: bool,

    // --- Output ---
    /// Write the JSON result to this file instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output_file: Option<String>,
}
