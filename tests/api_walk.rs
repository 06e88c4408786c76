mod common;

use common::{crawler, dir_entry, file_entry, tree_listing, RecordingSleeper, NOW};
use mockito::{Matcher, Server, ServerGuard};
use repocrawl::{FetchRequest, SkipReason, Source};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const TREE_URL: &str = "https://github.com/acme/demo/tree/main/src";

/// Mocks the branch listing and the repository pre-check for `acme/demo`.
fn mock_repo(server: &mut ServerGuard, blobs: usize) -> Vec<mockito::Mock> {
    vec![
        server
            .mock("GET", "/repos/acme/demo/branches")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "main"}, {"name": "release/2.0"}]"#)
            .create(),
        server
            .mock("GET", "/repos/acme/demo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "demo", "default_branch": "main"}"#)
            .create(),
        server
            .mock("GET", "/repos/acme/demo/git/trees/main")
            .match_query(Matcher::UrlEncoded("recursive".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tree_listing(blobs))
            .create(),
    ]
}

#[test]
fn test_scenario_a_filters_and_size_gate() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _repo = mock_repo(&mut server, 3);

    let listing = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(format!(
            "[{}, {}, {}]",
            file_entry(&base, "src/a.py", 500),
            file_entry(&base, "src/b.py", 2000),
            file_entry(&base, "src/readme.md", 100)
        ))
        .expect(1)
        .create();
    let a_py = server
        .mock("GET", "/raw/src/a.py")
        .with_status(200)
        .with_body("# a\n".repeat(125))
        .expect(1)
        .create();
    let untouched = server
        .mock("GET", Matcher::Regex(r"^/raw/src/(b\.py|readme\.md)$".to_string()))
        .expect(0)
        .create();

    let request = FetchRequest::new(TREE_URL)
        .include(["*.py"])
        .max_file_size(1024)
        .relative_paths(true);
    let result = crawler(&base, cache.path(), Arc::default()).crawl(&request);

    listing.assert();
    a_py.assert();
    untouched.assert();
    assert!(result.is_success(), "{:?}", result.stats.error);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files["a.py"], "# a\n".repeat(125));
    assert_eq!(result.stats.downloaded_count, 1);
    assert_eq!(result.stats.skipped_count, 2);
    assert_eq!(result.stats.base_path.as_deref(), Some("src"));
    assert_eq!(result.stats.source, Source::Api);

    let skipped: Vec<_> = result
        .stats
        .skipped_files
        .iter()
        .map(|s| (s.path.as_str(), s.size, s.reason))
        .collect();
    assert!(skipped.contains(&("b.py", 2000, SkipReason::Oversize)));
    assert!(skipped.contains(&("readme.md", 100, SkipReason::Excluded)));
    Ok(())
}

#[test]
fn test_excluded_directory_is_never_listed() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _repo = mock_repo(&mut server, 3);

    let _root = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            "[{}, {}]",
            dir_entry("src/vendor"),
            file_entry(&base, "src/main.py", 5)
        ))
        .create();
    let vendor = server
        .mock("GET", Matcher::Regex(r"^/repos/acme/demo/contents/src/vendor".to_string()))
        .expect(0)
        .create();
    let _main = server.mock("GET", "/raw/src/main.py").with_body("print").create();

    let request = FetchRequest::new(TREE_URL).exclude(["vendor/*"]).relative_paths(true);
    let result = crawler(&base, cache.path(), Arc::default()).crawl(&request);

    vendor.assert();
    assert_eq!(result.files.keys().collect::<Vec<_>>(), vec!["main.py"]);
    assert!(result.stats.skipped_files.is_empty());
    Ok(())
}

#[test]
fn test_rate_limit_is_waited_out_and_same_path_retried() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _repo = mock_repo(&mut server, 3);

    let limited = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("X-RateLimit-Remaining", "0")
        .with_header("X-RateLimit-Reset", &(NOW + 3).to_string())
        .with_body(r#"{"message": "API rate limit exceeded for 127.0.0.1."}"#)
        .expect(1)
        .create();
    let resumed = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!("[{}]", file_entry(&base, "src/a.py", 5)))
        .expect(1)
        .create();
    let _a_py = server.mock("GET", "/raw/src/a.py").with_body("print").create();

    let sleeper = Arc::new(RecordingSleeper::default());
    let result = crawler(&base, cache.path(), sleeper.clone()).crawl(&FetchRequest::new(TREE_URL));

    limited.assert();
    resumed.assert();
    assert!(result.is_success(), "{:?}", result.stats.error);
    assert_eq!(result.files["src/a.py"], "print");
    // One rate-limit wait, no backoff sleeps.
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(4)]);
    Ok(())
}

#[test]
fn test_transient_errors_are_retried_with_backoff() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _repo = mock_repo(&mut server, 3);

    let _root = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", file_entry(&base, "src/a.py", 5)))
        .create();
    let flaky = server.mock("GET", "/raw/src/a.py").with_status(502).expect(2).create();
    let recovered = server.mock("GET", "/raw/src/a.py").with_body("print").expect(1).create();

    let sleeper = Arc::new(RecordingSleeper::default());
    let result = crawler(&base, cache.path(), sleeper.clone()).crawl(&FetchRequest::new(TREE_URL));

    flaky.assert();
    recovered.assert();
    assert!(result.is_success());
    assert_eq!(result.files["src/a.py"], "print");
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    Ok(())
}

#[test]
fn test_repeated_crawls_are_identical() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _repo = mock_repo(&mut server, 3);

    let _root = server
        .mock("GET", "/repos/acme/demo/contents/src")
        .match_query(Matcher::Any)
        .with_body(format!(
            "[{}, {}]",
            file_entry(&base, "src/a.py", 5),
            dir_entry("src/pkg")
        ))
        .expect(2)
        .create();
    let _pkg = server
        .mock("GET", "/repos/acme/demo/contents/src/pkg")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", file_entry(&base, "src/pkg/b.py", 4)))
        .expect(2)
        .create();
    let _a = server.mock("GET", "/raw/src/a.py").with_body("print").create();
    let _b = server.mock("GET", "/raw/src/pkg/b.py").with_body("pass").create();

    let crawler = crawler(&base, cache.path(), Arc::default());
    let request = FetchRequest::new(TREE_URL).relative_paths(true);
    let first = crawler.crawl(&request);
    let second = crawler.crawl(&request);

    assert_eq!(first.files, second.files);
    assert_eq!(first.files.keys().collect::<Vec<_>>(), vec!["a.py", "pkg/b.py"]);
    Ok(())
}

#[test]
fn test_missing_repository_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let cache = tempdir()?;
    let _missing = server
        .mock("GET", "/repos/acme/demo")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create();
    let contents = server
        .mock("GET", Matcher::Regex("^/repos/acme/demo/contents".to_string()))
        .expect(0)
        .create();

    let result = crawler(&server.url(), cache.path(), Arc::default())
        .crawl(&FetchRequest::new("https://github.com/acme/demo"));

    contents.assert();
    assert!(result.files.is_empty());
    assert_eq!(result.stats.source, Source::Api);
    let error = result.stats.error.unwrap();
    assert!(error.contains("Repository acme/demo not found"), "{}", error);
    assert!(error.contains("private repository"), "{}", error);
    Ok(())
}

#[test]
fn test_branch_with_slashes_and_unknown_ref() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new();
    let base = server.url();
    let cache = tempdir()?;
    let _branches = server
        .mock("GET", "/repos/acme/demo/branches")
        .match_query(Matcher::Any)
        .with_body(r#"[{"name": "main"}, {"name": "release/2.0"}]"#)
        .create();
    let _repo = server
        .mock("GET", "/repos/acme/demo")
        .with_body(r#"{"default_branch": "main"}"#)
        .create();
    let _count = server
        .mock("GET", Matcher::Regex(r"^/repos/acme/demo/git/trees/release(/|%2F)2\.0".to_string()))
        .with_body(tree_listing(1))
        .create();
    let docs = server
        .mock("GET", "/repos/acme/demo/contents/docs")
        .match_query(Matcher::UrlEncoded("ref".into(), "release/2.0".into()))
        .with_body(format!("[{}]", file_entry(&base, "docs/guide.md", 7)))
        .expect(1)
        .create();
    let _guide = server.mock("GET", "/raw/docs/guide.md").with_body("# Guide").create();
    let _no_tree = server
        .mock("GET", "/repos/acme/demo/git/trees/nope")
        .with_status(404)
        .create();

    let crawler = crawler(&base, cache.path(), Arc::default());

    let result = crawler.crawl(&FetchRequest::new("https://github.com/acme/demo/tree/release/2.0/docs"));
    docs.assert();
    assert!(result.is_success(), "{:?}", result.stats.error);
    assert_eq!(result.files["docs/guide.md"], "# Guide");

    let invalid = crawler.crawl(&FetchRequest::new("https://github.com/acme/demo/tree/nope/docs"));
    assert!(invalid.files.is_empty());
    assert_eq!(invalid.stats.error.as_deref(), Some("Invalid path in repository"));
    Ok(())
}

#[test]
fn test_malformed_url_is_a_structured_result() {
    let cache = tempdir().unwrap();
    let result = crawler("http://127.0.0.1:9", cache.path(), Arc::default())
        .crawl(&FetchRequest::new("https://github.com/acme"));

    assert!(result.files.is_empty());
    assert!(result.stats.error.unwrap().starts_with("Invalid GitHub URL"));
}
