//! Integration tests for HubRelay
//!
//! Exercises the batch commit workflow end-to-end against an in-memory
//! git object store that mimics the upstream API's semantics: content-
//! addressed blobs, overlay tree creation, and non-fast-forward ref
//! update rejection.

use hubrelay::commit::{commit_files, FileInput};
use hubrelay::github::{GitCommit, GitDataApi, GitRef, ObjectRef, RefObject, TreeEntry};
use hubrelay::{RelayError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One stored commit: tree, parents, message
#[derive(Debug, Clone)]
struct StoredCommit {
    tree: String,
    parents: Vec<String>,
    message: String,
}

#[derive(Debug, Default)]
struct FakeRepo {
    /// branch name -> commit sha
    refs: HashMap<String, String>,
    commits: HashMap<String, StoredCommit>,
    /// tree sha -> (path -> blob sha)
    trees: HashMap<String, BTreeMap<String, String>>,
    /// blob sha -> content
    blobs: HashMap<String, Vec<u8>>,
    commit_counter: u64,
}

/// In-memory stand-in for the upstream git data API
#[derive(Default)]
struct FakeGitData {
    repo: Mutex<FakeRepo>,
    /// Total upstream calls observed (validation must reject before any)
    calls: AtomicU64,
    /// 1-based blob-creation index to fail at, simulating a network error
    fail_blob_at: Option<u64>,
    blob_calls: AtomicU64,
    /// Branch to move under the orchestrator's feet on the first ref update
    concurrent_move_on: Mutex<Option<String>>,
}

/// Content-addressed id: FNV-1a over the bytes
fn content_sha(prefix: &str, bytes: &[u8]) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{}{:016x}", prefix, hash)
}

impl FakeGitData {
    /// Seed a repository with one branch holding one commit of `files`
    fn with_repo(branch: &str, files: &[(&str, &str)]) -> Self {
        let fake = Self::default();
        {
            let mut repo = fake.repo.lock().unwrap();
            let mut tree = BTreeMap::new();
            for (path, content) in files {
                let sha = content_sha("b", content.as_bytes());
                repo.blobs.insert(sha.clone(), content.as_bytes().to_vec());
                tree.insert(path.to_string(), sha);
            }
            let tree_sha = content_sha("t", format!("{:?}", tree).as_bytes());
            repo.trees.insert(tree_sha.clone(), tree);

            let commit_sha = "c0".to_string();
            repo.commits.insert(
                commit_sha.clone(),
                StoredCommit {
                    tree: tree_sha,
                    parents: vec![],
                    message: "initial".to_string(),
                },
            );
            repo.refs.insert(branch.to_string(), commit_sha);
        }
        fake
    }

    fn fail_blob_at(mut self, index: u64) -> Self {
        self.fail_blob_at = Some(index);
        self
    }

    fn move_branch_concurrently(self, branch: &str) -> Self {
        *self.concurrent_move_on.lock().unwrap() = Some(branch.to_string());
        self
    }

    fn tip(&self, branch: &str) -> String {
        self.repo.lock().unwrap().refs[branch].clone()
    }

    fn tree_of(&self, commit_sha: &str) -> BTreeMap<String, String> {
        let repo = self.repo.lock().unwrap();
        let tree_sha = &repo.commits[commit_sha].tree;
        repo.trees[tree_sha].clone()
    }

    fn commit(&self, commit_sha: &str) -> StoredCommit {
        self.repo.lock().unwrap().commits[commit_sha].clone()
    }

    fn blob_content(&self, sha: &str) -> Vec<u8> {
        self.repo.lock().unwrap().blobs[sha].clone()
    }

    fn commit_count(&self) -> usize {
        self.repo.lock().unwrap().commits.len()
    }

    fn total_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GitDataApi for FakeGitData {
    async fn get_ref(&self, _token: &str, owner: &str, repo: &str, branch: &str) -> Result<GitRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.repo.lock().unwrap();
        match state.refs.get(branch) {
            Some(sha) => Ok(GitRef {
                ref_name: format!("refs/heads/{}", branch),
                object: RefObject {
                    sha: sha.clone(),
                    object_type: "commit".to_string(),
                },
            }),
            None => Err(RelayError::RefNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }),
        }
    }

    async fn get_commit(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<GitCommit> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.repo.lock().unwrap();
        let stored = state.commits.get(sha).ok_or_else(|| RelayError::Upstream {
            status: 404,
            body: format!("commit {} not found", sha),
        })?;
        Ok(GitCommit {
            sha: sha.to_string(),
            tree: ObjectRef {
                sha: stored.tree.clone(),
            },
            parents: stored
                .parents
                .iter()
                .map(|p| ObjectRef { sha: p.clone() })
                .collect(),
            message: Some(stored.message.clone()),
        })
    }

    async fn create_blob(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
        content: &[u8],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let call = self.blob_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_blob_at == Some(call) {
            return Err(RelayError::UpstreamUnavailable(
                "connection reset by peer".to_string(),
            ));
        }

        let sha = content_sha("b", content);
        let mut state = self.repo.lock().unwrap();
        state.blobs.insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.repo.lock().unwrap();
        let mut tree = state
            .trees
            .get(base_tree_sha)
            .ok_or_else(|| RelayError::Upstream {
                status: 404,
                body: format!("base tree {} not found", base_tree_sha),
            })?
            .clone();

        // Overlay: entries replace matching paths, everything else persists
        for entry in entries {
            tree.insert(entry.path.clone(), entry.sha.clone());
        }

        let sha = content_sha("t", format!("{:?}", tree).as_bytes());
        state.trees.insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> Result<GitCommit> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.repo.lock().unwrap();
        state.commit_counter += 1;
        let sha = format!("c{}", state.commit_counter);
        state.commits.insert(
            sha.clone(),
            StoredCommit {
                tree: tree_sha.to_string(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(GitCommit {
            sha,
            tree: ObjectRef {
                sha: tree_sha.to_string(),
            },
            parents: parents.iter().map(|p| ObjectRef { sha: p.clone() }).collect(),
            message: Some(message.to_string()),
        })
    }

    async fn update_ref(
        &self,
        _token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Simulate a concurrent writer landing between ref read and update
        if let Some(victim) = self.concurrent_move_on.lock().unwrap().take() {
            if victim == branch {
                let mut state = self.repo.lock().unwrap();
                let old_tip = state.refs[branch].clone();
                let tree = state.commits[&old_tip].tree.clone();
                state.commit_counter += 1;
                let concurrent_sha = format!("concurrent-c{}", state.commit_counter);
                state.commits.insert(
                    concurrent_sha.clone(),
                    StoredCommit {
                        tree,
                        parents: vec![old_tip],
                        message: "concurrent write".to_string(),
                    },
                );
                state.refs.insert(branch.to_string(), concurrent_sha);
            }
        }

        let mut state = self.repo.lock().unwrap();
        let current = state.refs.get(branch).cloned().ok_or_else(|| {
            RelayError::RefNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            }
        })?;

        // Non-forced updates must be fast-forward from the current tip
        if !force {
            let parents = state
                .commits
                .get(sha)
                .map(|c| c.parents.clone())
                .unwrap_or_default();
            if !parents.contains(&current) {
                return Err(RelayError::RefConflict {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                });
            }
        }

        state.refs.insert(branch.to_string(), sha.to_string());
        Ok(GitRef {
            ref_name: format!("refs/heads/{}", branch),
            object: RefObject {
                sha: sha.to_string(),
                object_type: "commit".to_string(),
            },
        })
    }

    async fn create_ref(
        &self,
        _token: &str,
        _owner: &str,
        _repo: &str,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let branch = ref_name.trim_start_matches("refs/heads/").to_string();
        let mut state = self.repo.lock().unwrap();
        if state.refs.contains_key(&branch) {
            return Err(RelayError::Upstream {
                status: 422,
                body: "Reference already exists".to_string(),
            });
        }
        state.refs.insert(branch, sha.to_string());
        Ok(GitRef {
            ref_name: ref_name.to_string(),
            object: RefObject {
                sha: sha.to_string(),
                object_type: "commit".to_string(),
            },
        })
    }
}

fn file(path: &str, content: &str) -> FileInput {
    FileInput {
        path: path.to_string(),
        content: content.to_string(),
    }
}

mod batch_commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_file_commit_overlays_base_tree() {
        let fake = FakeGitData::with_repo("main", &[("a.txt", "old"), ("src/lib.rs", "code")]);
        let base_tree = fake.tree_of("c0");

        let result = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("a.txt", "hello")],
            "add a",
        )
        .await
        .unwrap();

        // The branch advanced to the new commit
        assert_eq!(fake.tip("main"), result.commit_sha);

        // a.txt now decodes to the new content
        let tree = fake.tree_of(&result.commit_sha);
        let blob = fake.blob_content(&tree["a.txt"]);
        assert_eq!(blob, b"hello");

        // Every other base entry is preserved unchanged
        for (path, sha) in &base_tree {
            if path != "a.txt" {
                assert_eq!(&tree[path], sha, "base entry {} must be preserved", path);
            }
        }
        assert_eq!(tree.len(), base_tree.len());

        // Per-file blob ids come back in caller order
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "a.txt");
        assert_eq!(result.files[0].sha, tree["a.txt"]);
    }

    #[tokio::test]
    async fn test_sequential_commits_chain_parents() {
        let fake = FakeGitData::with_repo("main", &[("README.md", "hi")]);

        let first = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("one.txt", "1"), file("two.txt", "2")],
            "first batch",
        )
        .await
        .unwrap();

        let second = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("three.txt", "3")],
            "second batch",
        )
        .await
        .unwrap();

        // Second commit's parent is exactly the first commit
        let stored = fake.commit(&second.commit_sha);
        assert_eq!(stored.parents, vec![first.commit_sha.clone()]);
        assert_eq!(stored.message, "second batch");

        // Both batches' files are all present at the final tip
        let tree = fake.tree_of(&second.commit_sha);
        for path in ["README.md", "one.txt", "two.txt", "three.txt"] {
            assert!(tree.contains_key(path), "{} missing from final tree", path);
        }
    }

    #[tokio::test]
    async fn test_missing_branch_is_ref_not_found() {
        let fake = FakeGitData::with_repo("main", &[("a", "1")]);

        let err = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "does-not-exist",
            &[file("a.txt", "x")],
            "msg",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RelayError::RefNotFound { .. }));
    }

    #[tokio::test]
    async fn test_blob_failure_leaves_branch_untouched() {
        let fake = FakeGitData::with_repo("main", &[("base.txt", "base")]).fail_blob_at(2);
        let tip_before = fake.tip("main");
        let commits_before = fake.commit_count();

        let err = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("a.txt", "1"), file("b.txt", "2"), file("c.txt", "3")],
            "three files",
        )
        .await
        .unwrap_err();

        // Tagged with the step and the file it failed at
        match &err {
            RelayError::BlobCreate { path, .. } => assert_eq!(path, "b.txt"),
            other => panic!("expected BlobCreate, got {:?}", other),
        }
        assert!(!err.is_ambiguous_commit());

        // No tree, commit, or ref update happened
        assert_eq!(fake.tip("main"), tip_before);
        assert_eq!(fake.commit_count(), commits_before);
    }

    #[tokio::test]
    async fn test_concurrent_writer_wins_and_conflict_surfaces() {
        let fake =
            FakeGitData::with_repo("main", &[("a", "1")]).move_branch_concurrently("main");

        let err = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("b.txt", "2")],
            "racing commit",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RelayError::RefConflict { .. }));
        assert!(err.is_ambiguous_commit());

        // The visible tip is the concurrent writer's commit, not ours
        assert!(fake.tip("main").starts_with("concurrent-"));
    }

    #[tokio::test]
    async fn test_zero_files_rejected_before_any_network_call() {
        let fake = FakeGitData::with_repo("main", &[("a", "1")]);

        let err = commit_files(&fake, "gho_test", "octocat", "hello", "main", &[], "msg")
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Validation(_)));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_paths_rejected_before_any_network_call() {
        let fake = FakeGitData::with_repo("main", &[("a", "1")]);

        let err = commit_files(
            &fake,
            "gho_test",
            "octocat",
            "hello",
            "main",
            &[file("same.txt", "x"), file("same.txt", "y")],
            "msg",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RelayError::Validation(_)));
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_identical_content_is_idempotent_by_blob_id() {
        let fake = FakeGitData::with_repo("main", &[("seed", "s")]);

        let first = commit_files(
            &fake,
            "gho_test",
            "o",
            "r",
            "main",
            &[file("a.txt", "same bytes")],
            "one",
        )
        .await
        .unwrap();

        let second = commit_files(
            &fake,
            "gho_test",
            "o",
            "r",
            "main",
            &[file("b.txt", "same bytes")],
            "two",
        )
        .await
        .unwrap();

        // Content-addressed: identical content yields the identical blob id
        assert_eq!(first.files[0].sha, second.files[0].sha);
    }
}

mod branch_ref_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_ref_from_base_tip() {
        let fake = FakeGitData::with_repo("main", &[("a", "1")]);
        let tip = fake.tip("main");

        let created = fake
            .create_ref("gho_test", "o", "r", "refs/heads/feature", &tip)
            .await
            .unwrap();
        assert_eq!(created.object.sha, tip);
        assert_eq!(fake.tip("feature"), tip);
    }

    #[tokio::test]
    async fn test_create_existing_ref_rejected() {
        let fake = FakeGitData::with_repo("main", &[("a", "1")]);
        let tip = fake.tip("main");

        let err = fake
            .create_ref("gho_test", "o", "r", "refs/heads/main", &tip)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Upstream { status: 422, .. }));
    }
}
