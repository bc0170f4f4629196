//! Git object-graph primitives
//!
//! The low-level git data API: refs, commits, trees, and blobs. These are
//! the calls the batch commit workflow composes, kept behind the
//! [`GitDataApi`] trait so the workflow can be exercised against an
//! in-memory implementation.
//!
//! Blob content always travels base64-encoded, matching what the tree
//! entries created alongside it reference.

use super::{error_from_response, map_transport};
use crate::github::GitHubClient;
use crate::{RelayError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for git data calls
const GIT_DATA_TIMEOUT: Duration = Duration::from_secs(15);

/// A named ref (branch) pointing at a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: RefObject,
}

/// The object a ref points at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// A commit in the object graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree: ObjectRef,
    #[serde(default)]
    pub parents: Vec<ObjectRef>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Bare sha reference to another object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub sha: String,
}

/// One entry of a tree to create
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: String,
}

impl TreeEntry {
    /// A regular-file blob entry
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            entry_type: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateBlobRequest<'a> {
    content: String,
    encoding: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTreeRequest<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
struct CreateCommitRequest<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateRefRequest<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Debug, Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    sha: String,
}

/// The git data operations the batch commit workflow composes
#[async_trait::async_trait]
pub trait GitDataApi: Send + Sync {
    /// Resolve a branch ref to its current commit
    async fn get_ref(&self, token: &str, owner: &str, repo: &str, branch: &str) -> Result<GitRef>;

    /// Fetch a commit object
    async fn get_commit(&self, token: &str, owner: &str, repo: &str, sha: &str)
        -> Result<GitCommit>;

    /// Create a blob from raw content, returning its sha
    async fn create_blob(&self, token: &str, owner: &str, repo: &str, content: &[u8])
        -> Result<String>;

    /// Create a tree layered on a base tree, returning its sha
    async fn create_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String>;

    /// Create a commit object
    async fn create_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> Result<GitCommit>;

    /// Move a branch ref to a commit; `force = false` is rejected upstream
    /// if the branch moved since it was read
    async fn update_ref(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef>;

    /// Create a new ref (e.g. "refs/heads/feature") pointing at a commit
    async fn create_ref(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef>;
}

#[async_trait::async_trait]
impl GitDataApi for GitHubClient {
    async fn get_ref(&self, token: &str, owner: &str, repo: &str, branch: &str) -> Result<GitRef> {
        let url = self.url(&format!("repos/{}/{}/git/ref/heads/{}", owner, repo, branch));
        debug!(owner = %owner, repo = %repo, branch = %branch, "Resolving ref");

        let response = self
            .http()
            .get(&url)
            .bearer_auth(token)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RelayError::RefNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(error_from_response(response).await),
        }
    }

    async fn get_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<GitCommit> {
        let url = self.url(&format!("repos/{}/{}/git/commits/{}", owner, repo, sha));
        debug!(owner = %owner, repo = %repo, sha = %sha, "Fetching commit");

        let response = self
            .http()
            .get(&url)
            .bearer_auth(token)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn create_blob(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        content: &[u8],
    ) -> Result<String> {
        let url = self.url(&format!("repos/{}/{}/git/blobs", owner, repo));

        let request = CreateBlobRequest {
            content: BASE64.encode(content),
            encoding: "base64",
        };

        let response = self
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let created: CreatedObject = response.json().await?;
        Ok(created.sha)
    }

    async fn create_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String> {
        let url = self.url(&format!("repos/{}/{}/git/trees", owner, repo));
        debug!(owner = %owner, repo = %repo, base_tree = %base_tree_sha, entries = entries.len(), "Creating tree");

        let request = CreateTreeRequest {
            base_tree: base_tree_sha,
            tree: entries,
        };

        let response = self
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let created: CreatedObject = response.json().await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> Result<GitCommit> {
        let url = self.url(&format!("repos/{}/{}/git/commits", owner, repo));
        debug!(owner = %owner, repo = %repo, tree = %tree_sha, "Creating commit");

        let request = CreateCommitRequest {
            message,
            tree: tree_sha,
            parents,
        };

        let response = self
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_ref(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef> {
        let url = self.url(&format!("repos/{}/{}/git/refs/heads/{}", owner, repo, branch));
        debug!(owner = %owner, repo = %repo, branch = %branch, sha = %sha, force = force, "Updating ref");

        let request = UpdateRefRequest { sha, force };

        let response = self
            .http()
            .patch(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        match response.status() {
            // Non-fast-forward rejection: the branch moved since it was read
            StatusCode::UNPROCESSABLE_ENTITY if !force => Err(RelayError::RefConflict {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }),
            StatusCode::NOT_FOUND => Err(RelayError::RefNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(error_from_response(response).await),
        }
    }

    async fn create_ref(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef> {
        let url = self.url(&format!("repos/{}/{}/git/refs", owner, repo));
        debug!(owner = %owner, repo = %repo, ref_name = %ref_name, "Creating ref");

        let request = CreateRefRequest { ref_name, sha };

        let response = self
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(GIT_DATA_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}
