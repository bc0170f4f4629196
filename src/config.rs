//! HubRelay configuration file handling
//!
//! Loads and manages the ~/.config/hubrelay/config.yaml file. Secrets
//! (OAuth client id/secret) can be supplied or overridden through
//! environment variables so they never need to live on disk.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:3000"
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Origin allowed to call the API with credentials (the chat frontend)
    #[serde(default = "default_client_origin")]
    pub client_origin: String,

    /// Request body size limit in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_client_origin() -> String {
    "https://chat.openai.com".to_string()
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            client_origin: default_client_origin(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// GitHub OAuth app settings for the authorization-code flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth app client id (env: GITHUB_CLIENT_ID)
    #[serde(default)]
    pub client_id: String,

    /// OAuth app client secret (env: GITHUB_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret: String,

    /// Callback URL registered with the OAuth app (env: GITHUB_CALLBACK_URL)
    #[serde(default)]
    pub callback_url: String,

    /// Requested token scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec![
        "repo".to_string(),
        "user".to_string(),
        "workflow".to_string(),
    ]
}

/// Session store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: u64,
}

fn default_session_ttl_hours() -> u64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl_hours(),
        }
    }
}

/// Companion extension distribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Directory holding the unpacked extension source
    #[serde(default = "default_extension_dir")]
    pub source_dir: PathBuf,
}

fn default_extension_dir() -> PathBuf {
    PathBuf::from("extension")
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            source_dir: default_extension_dir(),
        }
    }
}

/// HubRelay configuration
///
/// Represents the complete ~/.config/hubrelay/config.yaml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub OAuth app settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Session store settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Extension distribution settings
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// GitHub REST API base URL (override for GitHub Enterprise or tests)
    #[serde(default = "default_api_url")]
    pub github_api_url: String,

    /// GitHub web base URL used for the OAuth endpoints
    #[serde(default = "default_oauth_base_url")]
    pub github_oauth_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_oauth_base_url() -> String {
    "https://github.com".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            oauth: OAuthConfig::default(),
            session: SessionConfig::default(),
            extension: ExtensionConfig::default(),
            github_api_url: default_api_url(),
            github_oauth_url: default_oauth_base_url(),
        }
    }
}

impl RelayConfig {
    /// Create a new configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default path (~/.config/hubrelay/config.yaml)
    ///
    /// A missing file is not an error: defaults plus environment overrides
    /// are enough to run against github.com.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            let mut config = Self::new();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            crate::RelayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config: RelayConfig = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("hubrelay");
        path.push("config.yaml");
        path
    }

    /// Overlay secrets and deployment settings from the environment
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GITHUB_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Ok(v) = std::env::var("GITHUB_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Ok(v) = std::env::var("GITHUB_CALLBACK_URL") {
            self.oauth.callback_url = v;
        }
        if let Ok(v) = std::env::var("HUBRELAY_LISTEN") {
            self.server.listen = v;
        }
        if let Ok(v) = std::env::var("CLIENT_ORIGIN") {
            self.server.client_origin = v;
        }
    }

    /// Check that the fields required for the OAuth flow are present
    pub fn validate_oauth(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() {
            return Err(crate::RelayError::Config(
                "oauth.client_id is not set (GITHUB_CLIENT_ID)".to_string(),
            ));
        }
        if self.oauth.client_secret.is_empty() {
            return Err(crate::RelayError::Config(
                "oauth.client_secret is not set (GITHUB_CLIENT_SECRET)".to_string(),
            ));
        }
        if self.oauth.callback_url.is_empty() {
            return Err(crate::RelayError::Config(
                "oauth.callback_url is not set (GITHUB_CALLBACK_URL)".to_string(),
            ));
        }
        Ok(())
    }
}
