//! Gitea adapter.
//!
//! # Endpoints
//! All calls go to `{server}/api/v1/repos/{owner}/{repo}/contents/{path}`:
//! - Read and version: `GET ?ref={branch}`; the stored bytes are the
//!   base64 `content` field, the version token is `sha`
//! - Existence: `HEAD ?ref={branch}`
//! - Write: `POST` to create, `PUT` to update, JSON `{content, branch, sha?}`

use async_trait::async_trait;
use axum::body::Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::client::{read_raw, PlatformClient};
use crate::backend::{BackendAdapter, BackendError, ExistenceProbe, RawResponse};
use crate::http::request::RequestContext;

/// The parts of a contents document the proxy uses.
#[derive(Debug, Deserialize)]
struct ContentsDocument {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sha: String,
}

/// Body of a create or update call.
#[derive(Debug, Serialize)]
struct WriteFileOptions<'a> {
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// Adapter for the Gitea contents API.
#[derive(Debug, Clone)]
pub struct GiteaAdapter {
    client: PlatformClient,
}

impl GiteaAdapter {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    fn contents_url(&self, ctx: &RequestContext, with_ref: bool) -> Result<Url, BackendError> {
        let segments = [
            "api",
            "v1",
            "repos",
            ctx.project.as_str(),
            ctx.repository.as_str(),
            "contents",
        ]
        .into_iter()
        .chain(ctx.path_segments());

        if with_ref {
            self.client.url(segments, &[("ref", ctx.branch.as_str())])
        } else {
            self.client.url(segments, &[])
        }
    }
}

/// Decode a contents document's base64 payload. Gitea wraps long lines.
///
/// Gitea leaves `content` null for blobs above its API size limit, symlinks
/// and LFS pointers; that is never read as an empty file.
fn decode_content(document: &ContentsDocument) -> Result<Vec<u8>, BackendError> {
    let content = document.content.as_deref().ok_or_else(|| {
        BackendError::UnexpectedPayload("contents document has no content".to_string())
    })?;
    let encoded: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(encoded)
        .map_err(|e| BackendError::UnexpectedPayload(format!("content is not base64: {}", e)))
}

#[async_trait]
impl BackendAdapter for GiteaAdapter {
    async fn fetch_raw(&self, ctx: &RequestContext) -> Result<RawResponse, BackendError> {
        let url = self.contents_url(ctx, true)?;
        let raw = self
            .client
            .send_raw("read", self.client.request(Method::GET, url, ctx))
            .await?;
        if raw.status != StatusCode::OK {
            return Ok(raw);
        }

        let document: ContentsDocument = serde_json::from_slice(&raw.body).map_err(|e| {
            BackendError::UnexpectedPayload(format!("contents document: {}", e))
        })?;
        Ok(RawResponse {
            body: Bytes::from(decode_content(&document)?),
            ..raw
        })
    }

    async fn fetch_version_token(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<String>, BackendError> {
        let url = self.contents_url(ctx, true)?;
        let response = self
            .client
            .send("file_metadata", self.client.request(Method::GET, url, ctx))
            .await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(
                status = response.status().as_u16(),
                path = %ctx.path,
                "Failed to fetch file metadata"
            );
            return Ok(None);
        }

        let raw = read_raw(response).await?;
        match serde_json::from_slice::<ContentsDocument>(&raw.body) {
            Ok(document) if !document.sha.is_empty() => Ok(Some(document.sha)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, path = %ctx.path, "Failed to parse file metadata");
                Ok(None)
            }
        }
    }

    async fn probe_existence(&self, ctx: &RequestContext) -> Result<ExistenceProbe, BackendError> {
        let url = self.contents_url(ctx, true)?;
        let response = self
            .client
            .send("exists", self.client.request(Method::HEAD, url, ctx))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ExistenceProbe::default());
        }

        let version_token = match self.fetch_version_token(ctx).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Updating without a content sha");
                None
            }
        };

        Ok(ExistenceProbe {
            exists: true,
            version_token,
        })
    }

    async fn write(
        &self,
        ctx: &RequestContext,
        payload: Bytes,
        probe: ExistenceProbe,
    ) -> Result<RawResponse, BackendError> {
        let (method, sha) = if probe.exists {
            (Method::PUT, probe.version_token)
        } else {
            (Method::POST, None)
        };
        let body = WriteFileOptions {
            content: STANDARD.encode(&payload),
            branch: &ctx.branch,
            sha,
        };

        let url = self.contents_url(ctx, false)?;
        let request = self.client.request(method, url, ctx).json(&body);
        self.client.send_raw("write", request).await
    }
}
