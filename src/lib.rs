//! HubRelay - GitHub relay for chat assistants
//!
//! HubRelay is a backend service that lets a chat assistant act on a user's
//! behalf against the GitHub API. It brokers the OAuth authorization-code
//! exchange, keeps the delegated access token in a server-side session, and
//! forwards a fixed set of repository operations upstream. Multi-file
//! writes go through the batch commit workflow, which composes the git
//! object-graph primitives into one atomic commit per request.
//!
//! # Architecture
//!
//! - **config**: YAML configuration with environment overrides
//! - **auth**: GitHub OAuth authorization-code flow
//! - **session**: cookie-addressed server-side session store
//! - **github**: REST client (proxy operations + git data primitives)
//! - **commit**: the batch multi-file commit workflow
//! - **server**: axum HTTP surface
//! - **extension**: companion browser extension packaging

// Core modules
pub mod commit;
pub mod config;
pub mod error;
pub mod github;

// Components
pub mod auth;
pub mod extension;
pub mod logging;
pub mod server;
pub mod session;

// Re-exports
pub use error::{RelayError, Result};
