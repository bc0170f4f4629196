//! GitHub API layer
//!
//! Two surfaces over the same authenticated REST API:
//! - [`GitHubClient`] relay operations for the single-call proxy routes
//!   (repos, contents, branches), which pass GitHub's JSON through.
//! - [`GitDataApi`] the typed git object-graph primitives (refs, commits,
//!   trees, blobs) composed by the batch commit workflow.
//!
//! Every call takes the caller's bearer token explicitly; there is no
//! ambient credential.

mod client;
mod git_data;

pub use client::{
    CreateFileRequest, CreateRepoRequest, GitHubClient, UpdateFileRequest,
};
pub use git_data::{GitCommit, GitDataApi, GitRef, ObjectRef, RefObject, TreeEntry};

use crate::RelayError;

/// Map reqwest transport failures onto the upstream-availability taxonomy
pub(crate) fn map_transport(e: reqwest::Error) -> RelayError {
    if e.is_connect() || e.is_timeout() {
        RelayError::UpstreamUnavailable(e.to_string())
    } else {
        RelayError::Http(e)
    }
}

/// Translate a non-success upstream response into a typed error
pub(crate) async fn error_from_response(response: reqwest::Response) -> RelayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        RelayError::UpstreamUnavailable(format!("HTTP {}: {}", status, body))
    } else {
        RelayError::Upstream {
            status: status.as_u16(),
            body,
        }
    }
}
