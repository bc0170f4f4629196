//! Authentication module for HubRelay
//!
//! Implements the GitHub OAuth authorization-code flow: the relay redirects
//! the browser to GitHub's authorize page, then exchanges the returned code
//! for a delegated access token server-side. The token never reaches the
//! chat frontend; it lives in the server-side session.

use crate::config::OAuthConfig;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request timeout for the OAuth endpoints
const OAUTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Access token response from GitHub
///
/// GitHub reports OAuth failures inside a 200 response, so every field
/// is optional and the error pair is checked first.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// GitHub user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Brokers the authorization-code exchange against a GitHub instance
pub struct OAuthBroker {
    client: reqwest::Client,
    oauth_base_url: String,
    api_base_url: String,
    config: OAuthConfig,
}

impl OAuthBroker {
    /// Create a broker for the given GitHub instance
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        oauth_base_url: impl Into<String>,
        api_base_url: impl Into<String>,
        config: OAuthConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(OAUTH_TIMEOUT)
            .user_agent("hubrelay/0.3")
            .build()?;

        Ok(Self {
            client,
            oauth_base_url: oauth_base_url.into().trim_end_matches('/').to_string(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            config,
        })
    }

    /// Build the authorize-page URL the browser is redirected to
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
            self.oauth_base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(&self.config.scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = format!("{}/login/oauth/access_token", self.oauth_base_url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await
            .context("Failed to exchange authorization code")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::RelayError::Auth(format!(
                "Token exchange failed: HTTP {}: {}",
                status, body
            )));
        }

        let token_response: AccessTokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        if let Some(error) = token_response.error {
            let description = token_response.error_description.unwrap_or_default();
            return Err(crate::RelayError::Auth(format!(
                "GitHub OAuth error: {} - {}",
                error, description
            )));
        }

        token_response
            .access_token
            .ok_or_else(|| crate::RelayError::Auth("No access token in response".to_string()))
    }

    /// Fetch the authenticated user's profile
    pub async fn fetch_user(&self, token: &str) -> Result<GitHubUser> {
        let url = format!("{}/user", self.api_base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .context("Failed to fetch GitHub user")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::RelayError::Auth(format!(
                "GitHub user fetch failed: HTTP {} - {}",
                status, body
            )));
        }

        let user: GitHubUser = response
            .json()
            .await
            .context("Failed to parse GitHub user response")?;

        Ok(user)
    }
}
