//! GitHub REST client for the proxy routes
//!
//! Covers the single-call pass-through operations: list repositories,
//! read/write file contents, create repositories, list branches. Responses
//! are relayed as the JSON GitHub returned rather than re-modeled, since
//! the route layer forwards them verbatim to the chat frontend.

use super::{error_from_response, map_transport};
use crate::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for reads
const GET_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for writes
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
/// Per-request timeout for listing calls (can return large result sets)
const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub API client
///
/// Holds the shared HTTP client and base URL; the bearer token is passed
/// per call because each request acts for a different session's user.
pub struct GitHubClient {
    client: Client,
    api_base_url: String,
}

/// Request body for updating an existing file via the contents API
#[derive(Debug, Clone, Serialize)]
pub struct UpdateFileRequest {
    pub message: String,
    /// Base64-encoded file content
    pub content: String,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Request body for creating a new file via the contents API
#[derive(Debug, Clone, Serialize)]
pub struct CreateFileRequest {
    pub message: String,
    /// Base64-encoded file content
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Request body for creating a repository
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    pub auto_init: bool,
}

impl GitHubClient {
    /// Create a new client against the given API base URL
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("hubrelay/0.3"),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github+json"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    /// Encode raw file content for the contents API
    pub fn encode_content(content: &str) -> String {
        BASE64.encode(content.as_bytes())
    }

    /// List the authenticated user's repositories
    pub async fn list_repos(&self, token: &str) -> Result<Value> {
        let url = self.url("user/repos?per_page=100");
        debug!("Listing repositories");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch file or directory contents at a ref
    pub async fn get_contents(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Value> {
        let url = self.url(&format!(
            "repos/{}/{}/contents/{}?ref={}",
            owner,
            repo,
            path,
            urlencoding::encode(branch)
        ));
        debug!(owner = %owner, repo = %repo, path = %path, branch = %branch, "Fetching contents");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(GET_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Update an existing file (contents API `PUT`, sha required)
    pub async fn update_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        request: UpdateFileRequest,
    ) -> Result<Value> {
        let url = self.url(&format!("repos/{}/{}/contents/{}", owner, repo, path));
        debug!(owner = %owner, repo = %repo, path = %path, "Updating file");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Create a new file (contents API `PUT`, no sha)
    pub async fn create_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        request: CreateFileRequest,
    ) -> Result<Value> {
        let url = self.url(&format!("repos/{}/{}/contents/{}", owner, repo, path));
        debug!(owner = %owner, repo = %repo, path = %path, "Creating file");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Create a repository for the authenticated user
    pub async fn create_repo(&self, token: &str, request: CreateRepoRequest) -> Result<Value> {
        let url = self.url("user/repos");
        debug!(name = %request.name, "Creating repository");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// List a repository's branches
    pub async fn list_branches(&self, token: &str, owner: &str, repo: &str) -> Result<Value> {
        let url = self.url(&format!("repos/{}/{}/branches", owner, repo));
        debug!(owner = %owner, repo = %repo, "Listing branches");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}
