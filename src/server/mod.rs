//! HTTP server for HubRelay
//!
//! Exposes the OAuth flow, the proxied repository operations, and the
//! extension download over HTTP.
//!
//! # Routes
//!
//! - `GET /` - Running banner
//! - `GET /health` - Health check
//! - `GET /login`, `GET /success` - Browser-facing HTML pages
//! - `GET /auth/github` - Redirect to GitHub's authorize page
//! - `GET /auth/github/callback` - Code exchange, session creation
//! - `GET /auth/logout` - Drop the session
//! - `GET /api/user` - The session's user profile
//! - `GET /api/repos` - List the user's repositories
//! - `POST /api/repos` - Create a repository
//! - `GET /api/repos/{owner}/{repo}/contents/{*path}` - Read file/directory
//! - `POST /api/repos/{owner}/{repo}/contents/{*path}` - Update a file
//! - `POST /api/repos/{owner}/{repo}/create/{*path}` - Create a file
//! - `POST /api/repos/{owner}/{repo}/batch-create` - Batch multi-file commit
//! - `GET /api/repos/{owner}/{repo}/branches` - List branches
//! - `POST /api/repos/{owner}/{repo}/branches` - Create a branch
//! - `GET /extension` - Extension download page
//! - `GET /extension/download` - The extension bundle
//!
//! # Example
//!
//! ```no_run
//! use hubrelay::config::RelayConfig;
//! use hubrelay::server::RelayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::load_default().expect("Failed to load config");
//!     let server = RelayServer::new(config).expect("Failed to create server");
//!     server.run().await.expect("Server failed");
//! }
//! ```

mod pages;

use crate::auth::OAuthBroker;
use crate::commit::{commit_files, BatchCommit, FileInput};
use crate::config::RelayConfig;
use crate::extension;
use crate::github::{
    CreateFileRequest, CreateRepoRequest, GitDataApi, GitHubClient, UpdateFileRequest,
};
use crate::session::{Session, SessionStore, SessionUser};
use crate::RelayError;
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Cookie carrying the session id
const SESSION_COOKIE: &str = "hubrelay_session";

/// How often expired sessions are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Shared server state
struct AppState {
    config: RelayConfig,
    sessions: SessionStore,
    github: GitHubClient,
    oauth: OAuthBroker,
}

/// HTTP server for HubRelay
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a new server from configuration
    pub fn new(config: RelayConfig) -> crate::Result<Self> {
        let github = GitHubClient::new(&config.github_api_url)?;
        let oauth = OAuthBroker::new(
            &config.github_oauth_url,
            &config.github_api_url,
            config.oauth.clone(),
        )?;
        let sessions = SessionStore::new(config.session.ttl_hours);

        Ok(Self {
            state: Arc::new(AppState {
                config,
                sessions,
                github,
                oauth,
            }),
        })
    }

    /// Build the router with CORS, tracing, and body-limit layers
    fn router(state: Arc<AppState>) -> Router {
        let max_body_size = state.config.server.max_body_size;
        let cors = cors_layer(&state.config.server.client_origin);

        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/login", get(login))
            .route("/success", get(success))
            .route("/auth/github", get(auth_start))
            .route("/auth/github/callback", get(auth_callback))
            .route("/auth/logout", get(logout))
            .route("/api/user", get(get_user))
            .route("/api/repos", get(list_repos).post(create_repo))
            .route(
                "/api/repos/{owner}/{repo}/contents/{*path}",
                get(get_contents).post(update_file),
            )
            .route("/api/repos/{owner}/{repo}/create/{*path}", post(create_file))
            .route("/api/repos/{owner}/{repo}/batch-create", post(batch_create))
            .route(
                "/api/repos/{owner}/{repo}/branches",
                get(list_branches).post(create_branch),
            )
            .route("/extension", get(extension_info))
            .route("/extension/download", get(extension_download))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(max_body_size))
            .with_state(state)
    }

    /// Run the server on the configured listen address
    pub async fn run(self) -> crate::Result<()> {
        let addr = self.state.config.server.listen.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Config(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(
            addr = %addr,
            client_origin = %self.state.config.server.client_origin,
            "HubRelay listening"
        );

        // Periodic session sweep so abandoned logins don't accumulate
        let sweep_state = self.state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                sweep_state.sessions.sweep().await;
            }
        });

        axum::serve(listener, Self::router(self.state))
            .await
            .map_err(RelayError::Io)
    }
}

/// CORS restricted to the configured chat frontend, with credentials
fn cors_layer(client_origin: &str) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    match client_origin.parse::<HeaderValue>() {
        Ok(origin) => layer = layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %client_origin, "Invalid client_origin, CORS disabled");
        }
    }
    layer
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters for content reads
#[derive(Debug, Deserialize)]
struct ContentsQuery {
    branch: Option<String>,
}

/// Body for updating an existing file
#[derive(Debug, Deserialize)]
struct UpdateFileBody {
    content: String,
    message: String,
    sha: String,
    branch: Option<String>,
}

/// Body for creating a new file
#[derive(Debug, Deserialize)]
struct CreateFileBody {
    content: String,
    message: String,
    branch: Option<String>,
}

/// Body for creating a repository
#[derive(Debug, Deserialize)]
struct CreateRepoBody {
    name: String,
    description: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    auto_init: bool,
}

/// Body for the batch multi-file commit
#[derive(Debug, Deserialize)]
struct BatchCreateBody {
    files: Vec<FileInput>,
    message: String,
    branch: String,
}

/// Response for the batch multi-file commit
#[derive(Debug, Serialize)]
struct BatchCreateResponse {
    message: String,
    commit: String,
    files: Vec<crate::commit::FileBlob>,
}

impl From<BatchCommit> for BatchCreateResponse {
    fn from(result: BatchCommit) -> Self {
        Self {
            message: "Files created successfully".to_string(),
            commit: result.commit_sha,
            files: result.files,
        }
    }
}

/// Body for creating a branch
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBranchBody {
    base_branch: String,
    new_branch: String,
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

// ============================================================================
// Helpers
// ============================================================================

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Translate a relay error into an HTTP response
fn error_response(err: RelayError) -> HandlerError {
    let status = match &err {
        RelayError::Validation(_) => StatusCode::BAD_REQUEST,
        RelayError::Auth(_) => StatusCode::UNAUTHORIZED,
        RelayError::RefNotFound { .. } => StatusCode::NOT_FOUND,
        RelayError::RefConflict { .. } => StatusCode::CONFLICT,
        RelayError::UpstreamUnavailable(_) | RelayError::RefUpdateFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        // Relay the upstream status where it is meaningful to the caller
        RelayError::Upstream { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        RelayError::Extension(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn unauthorized() -> HandlerError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Not authenticated".to_string(),
        }),
    )
}

/// Extract the session id from the Cookie header
fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolve the request's session or fail with 401
async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Session, HandlerError> {
    let id = session_id_from_headers(headers).ok_or_else(unauthorized)?;
    state.sessions.get(&id).await.ok_or_else(unauthorized)
}

/// Public base URL of this deployment, for the extension page
fn server_url(state: &AppState, headers: &HeaderMap) -> String {
    let scheme = if state.config.oauth.callback_url.starts_with("https") {
        "https"
    } else {
        "http"
    };
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(&state.config.server.listen);
    format!("{}://{}", scheme, host)
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> impl IntoResponse {
    "HubRelay GitHub integration API is running"
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn login() -> impl IntoResponse {
    Html(pages::login_page())
}

async fn success() -> impl IntoResponse {
    Html(pages::success_page())
}

/// Start the OAuth flow: issue a state and redirect to GitHub
async fn auth_start(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .config
        .validate_oauth()
        .map_err(error_response)?;

    let oauth_state = state.sessions.issue_state().await;
    let url = state.oauth.authorize_url(&oauth_state);
    Ok(Redirect::to(&url))
}

/// OAuth callback: verify state, exchange the code, create the session
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    if !state.sessions.take_state(&query.state).await {
        return Err(error_response(RelayError::Auth(
            "Unknown or expired OAuth state".to_string(),
        )));
    }

    let token = state
        .oauth
        .exchange_code(&query.code)
        .await
        .map_err(error_response)?;

    let user = state
        .oauth
        .fetch_user(&token)
        .await
        .map_err(error_response)?;

    tracing::info!(login = %user.login, "User authenticated");

    let session_user = SessionUser {
        id: user.id,
        login: user.login,
        name: user.name,
        email: user.email,
    };
    let session_id = state.sessions.insert(session_user, token).await;

    let secure = if state.config.oauth.callback_url.starts_with("https") {
        "; Secure"
    } else {
        ""
    };
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        session_id.as_str(),
        secure
    );

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/success")))
}

/// Drop the session and clear the cookie
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(id) = session_id_from_headers(&headers) {
        state.sessions.remove(&id).await;
    }

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/"))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;
    Ok(Json(session.user))
}

async fn list_repos(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;
    let repos = state
        .github
        .list_repos(&session.access_token)
        .await
        .map_err(error_response)?;
    Ok(Json(repos))
}

async fn get_contents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<ContentsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;
    let branch = query.branch.as_deref().unwrap_or("main");

    let contents = state
        .github
        .get_contents(&session.access_token, &owner, &repo, &path, branch)
        .await
        .map_err(error_response)?;
    Ok(Json(contents))
}

async fn update_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Json(body): Json<UpdateFileBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;

    let request = UpdateFileRequest {
        message: body.message,
        content: GitHubClient::encode_content(&body.content),
        sha: body.sha,
        branch: body.branch,
    };
    let result = state
        .github
        .update_file(&session.access_token, &owner, &repo, &path, request)
        .await
        .map_err(error_response)?;
    Ok(Json(result))
}

async fn create_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Json(body): Json<CreateFileBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;

    let request = CreateFileRequest {
        message: body.message,
        content: GitHubClient::encode_content(&body.content),
        branch: body.branch,
    };
    let result = state
        .github
        .create_file(&session.access_token, &owner, &repo, &path, request)
        .await
        .map_err(error_response)?;
    Ok(Json(result))
}

async fn create_repo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateRepoBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;

    let request = CreateRepoRequest {
        name: body.name,
        description: body.description,
        private: body.private,
        auto_init: body.auto_init,
    };
    let result = state
        .github
        .create_repo(&session.access_token, request)
        .await
        .map_err(error_response)?;
    Ok(Json(result))
}

/// The batch multi-file commit route
async fn batch_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<BatchCreateBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;

    let result = commit_files(
        &state.github,
        &session.access_token,
        &owner,
        &repo,
        &body.branch,
        &body.files,
        &body.message,
    )
    .await
    .map_err(error_response)?;

    Ok(Json(BatchCreateResponse::from(result)))
}

async fn list_branches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;
    let branches = state
        .github
        .list_branches(&session.access_token, &owner, &repo)
        .await
        .map_err(error_response)?;
    Ok(Json(branches))
}

/// Create a branch from a base branch's current tip
async fn create_branch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<CreateBranchBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = require_session(&state, &headers).await?;
    let token = &session.access_token;

    let base = state
        .github
        .get_ref(token, &owner, &repo, &body.base_branch)
        .await
        .map_err(error_response)?;

    let ref_name = format!("refs/heads/{}", body.new_branch);
    let created = state
        .github
        .create_ref(token, &owner, &repo, &ref_name, &base.object.sha)
        .await
        .map_err(error_response)?;

    Ok(Json(created))
}

async fn extension_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    Html(pages::extension_page(&server_url(&state, &headers)))
}

async fn extension_download(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let bundle = extension::build_bundle(&state.config.extension.source_dir)
        .map_err(error_response)?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                extension::BUNDLE_CONTENT_TYPE.to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", extension::BUNDLE_FILENAME),
            ),
        ],
        bundle,
    ))
}
