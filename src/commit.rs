//! Batch multi-file commit workflow
//!
//! Turns a set of in-memory files into a single commit on a named branch
//! using the git object-graph primitives instead of the one-file-at-a-time
//! contents API:
//!
//! 1. resolve the branch ref to its current tip
//! 2. read the tip commit for its tree
//! 3. create one blob per file
//! 4. create a tree layered on the base tree
//! 5. create a commit with the tip as sole parent
//! 6. advance the ref, non-forced
//!
//! The six steps are strictly ordered; each consumes identifiers returned
//! by the previous one. A failure aborts the remaining steps and is tagged
//! with the step it occurred at. Nothing is retried and nothing is rolled
//! back: objects created before the failure are unreachable and inert, so
//! re-invoking the whole workflow is always safe.

use crate::github::{GitDataApi, TreeEntry};
use crate::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// One file to commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInput {
    /// Repository-relative path
    pub path: String,
    pub content: String,
}

/// Blob created for one input file, in caller-supplied order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlob {
    pub path: String,
    pub sha: String,
}

/// Result of a batch commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCommit {
    /// The new branch tip
    pub commit_sha: String,
    /// Per-file blob ids, for caller confirmation
    pub files: Vec<FileBlob>,
}

/// Reject a request before any network call is made
fn validate_request(files: &[FileInput], message: &str) -> Result<()> {
    if files.is_empty() {
        return Err(RelayError::Validation(
            "files must not be empty".to_string(),
        ));
    }
    if message.trim().is_empty() {
        return Err(RelayError::Validation(
            "commit message must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for file in files {
        if file.path.trim().is_empty() {
            return Err(RelayError::Validation(
                "file path must not be empty".to_string(),
            ));
        }
        if !seen.insert(file.path.as_str()) {
            // Duplicates would make the tree overlay order-dependent
            return Err(RelayError::Validation(format!(
                "duplicate path in request: {}",
                file.path
            )));
        }
    }
    Ok(())
}

/// Commit `files` to `branch` as one commit with `message`.
///
/// The new commit's parent is exactly the commit the branch pointed at
/// when the workflow began; if the branch moves in the meantime the final
/// non-forced ref update is rejected upstream and surfaces as
/// [`RelayError::RefConflict`]. Failures at steps 1-5 leave the branch
/// untouched (already-created blobs and trees are unreachable orphans);
/// only a step-6 failure is ambiguous, and is tagged as such.
pub async fn commit_files(
    api: &dyn GitDataApi,
    token: &str,
    owner: &str,
    repo: &str,
    branch: &str,
    files: &[FileInput],
    message: &str,
) -> Result<BatchCommit> {
    validate_request(files, message)?;

    info!(
        owner = %owner,
        repo = %repo,
        branch = %branch,
        files = files.len(),
        "Starting batch commit"
    );

    // 1. Resolve the branch tip
    let base_ref = api.get_ref(token, owner, repo, branch).await?;
    let base_commit_sha = base_ref.object.sha;

    // 2. Read the tip commit for its tree
    let base_commit = api.get_commit(token, owner, repo, &base_commit_sha).await?;
    let base_tree_sha = base_commit.tree.sha;
    debug!(base_commit = %base_commit_sha, base_tree = %base_tree_sha, "Resolved base");

    // 3. One blob per file, caller order preserved in the result
    let mut blobs = Vec::with_capacity(files.len());
    for file in files {
        let sha = api
            .create_blob(token, owner, repo, file.content.as_bytes())
            .await
            .map_err(|e| RelayError::BlobCreate {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;
        debug!(path = %file.path, blob = %sha, "Created blob");
        blobs.push(FileBlob {
            path: file.path.clone(),
            sha,
        });
    }

    // 4. Overlay tree on the base tree
    let entries: Vec<TreeEntry> = blobs
        .iter()
        .map(|b| TreeEntry::blob(b.path.clone(), b.sha.clone()))
        .collect();
    let tree_sha = api
        .create_tree(token, owner, repo, &base_tree_sha, &entries)
        .await
        .map_err(|e| RelayError::TreeCreate(e.to_string()))?;

    // 5. Commit with the original tip as sole parent
    let parents = vec![base_commit_sha.clone()];
    let commit = api
        .create_commit(token, owner, repo, message, &tree_sha, &parents)
        .await
        .map_err(|e| RelayError::CommitCreate(e.to_string()))?;

    // 6. Advance the ref, non-forced
    api.update_ref(token, owner, repo, branch, &commit.sha, false)
        .await
        .map_err(|e| match e {
            conflict @ RelayError::RefConflict { .. } => conflict,
            other => RelayError::RefUpdateFailed {
                branch: branch.to_string(),
                commit_sha: commit.sha.clone(),
                reason: other.to_string(),
            },
        })?;

    info!(commit = %commit.sha, "Batch commit complete");

    Ok(BatchCommit {
        commit_sha: commit.sha,
        files: blobs,
    })
}
