//! Error types for HubRelay
//!
//! Defines a comprehensive error enum covering all failure modes across the system.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for HubRelay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Comprehensive error type for HubRelay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation failures, rejected before any upstream call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication errors (OAuth exchange, missing or expired session)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Branch ref does not exist upstream
    #[error("Branch not found: {owner}/{repo}@{branch}")]
    RefNotFound {
        owner: String,
        repo: String,
        branch: String,
    },

    /// Non-forced ref update rejected because the branch moved since it was read
    #[error("Branch moved since read: {owner}/{repo}@{branch}")]
    RefConflict {
        owner: String,
        repo: String,
        branch: String,
    },

    /// Ref update failed after the new commit object was created; the
    /// commit exists but may be unreachable from any branch
    #[error("Ref update failed for {branch} after commit {commit_sha}: {reason}")]
    RefUpdateFailed {
        branch: String,
        commit_sha: String,
        reason: String,
    },

    /// Blob creation failed for one of the requested files
    #[error("Blob creation failed for {path}: {reason}")]
    BlobCreate { path: String, reason: String },

    /// Tree creation failed
    #[error("Tree creation failed: {0}")]
    TreeCreate(String),

    /// Commit creation failed
    #[error("Commit creation failed: {0}")]
    CommitCreate(String),

    /// Network failure or 5xx from the GitHub API
    #[error("GitHub unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Any other non-success response from the GitHub API
    #[error("GitHub API error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Extension bundle packaging errors
    #[error("Extension packaging error: {0}")]
    Extension(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl RelayError {
    /// Whether the failure happened after the new commit object was created,
    /// leaving a commit that exists but is unreachable from any branch.
    pub fn is_ambiguous_commit(&self) -> bool {
        matches!(
            self,
            RelayError::RefConflict { .. } | RelayError::RefUpdateFailed { .. }
        )
    }
}
