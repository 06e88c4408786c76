//! Everything that talks to the GitHub REST API.
//!
//! Requests flow through a [`HttpTransport`], are retried by the backoff in
//! [`retry`], and are classified into an [`ApiReply`] by the [`GitHubClient`].
//! The [`RemoteTreeWalker`] builds on the client to collect files.

pub mod client;
pub mod precheck;
pub mod refs;
pub mod retry;
pub mod transport;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiReply, GitHubClient, RepoLookup};
pub use precheck::{run_precheck, Precheck};
pub use refs::resolve_repo_ref;
pub use retry::{Clock, RetryPolicy, Sleeper, SystemClock, ThreadSleeper};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use walker::{RemoteTreeWalker, WalkFailure};
