//! Git hosting platform adapters.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → BackendAdapter::fetch_raw         (GET)
//!     → BackendAdapter::probe_existence   (POST, before writing)
//!         → fetch_version_token           (only when the write needs one)
//!     → BackendAdapter::write             (POST)
//!     → RawResponse (status, body, content type) back to the orchestrator
//! ```
//!
//! # Design Decisions
//! - One adapter per platform, chosen once at startup per route
//! - Version tokens are fetched right before each write and never cached
//! - Status codes are reported, not interpreted; the orchestrator decides

pub mod bitbucket;
pub mod client;
pub mod gitea;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use thiserror::Error;

use crate::http::request::RequestContext;

pub use bitbucket::BitbucketAdapter;
pub use client::PlatformClient;
pub use gitea::GiteaAdapter;

/// Supported hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Bitbucket,
    Gitea,
}

impl Platform {
    /// Route prefix and metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Bitbucket => "bitbucket",
            Platform::Gitea => "gitea",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform response, kept intact for pass-through.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
}

/// Whether the target file exists, and its current version if one is needed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceProbe {
    pub exists: bool,
    pub version_token: Option<String>,
}

/// Errors raised by adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The outbound call could not be completed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A successful platform response whose body could not be interpreted.
    #[error("unexpected platform response: {0}")]
    UnexpectedPayload(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

/// Storage capability of one hosting platform.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Read the stored file at `ctx.path` on `ctx.branch`.
    async fn fetch_raw(&self, ctx: &RequestContext) -> Result<RawResponse, BackendError>;

    /// Current version token of the target, if the platform has one for it.
    async fn fetch_version_token(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<String>, BackendError>;

    /// Lightweight existence check, followed by a token fetch when the write needs one.
    async fn probe_existence(&self, ctx: &RequestContext) -> Result<ExistenceProbe, BackendError>;

    /// Create or update the file with `payload`, returning the platform's response.
    async fn write(
        &self,
        ctx: &RequestContext,
        payload: Bytes,
        probe: ExistenceProbe,
    ) -> Result<RawResponse, BackendError>;
}
