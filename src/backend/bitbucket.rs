//! Bitbucket Server adapter.
//!
//! # Endpoints
//! - Read: `GET {server}/projects/{p}/repos/{r}/raw/{path}?at={branch}`
//! - Existence: `HEAD {server}/rest/api/1.0/projects/{p}/repos/{r}/browse/{path}?at={branch}`
//! - Version: `GET {server}/rest/api/1.0/projects/{p}/repos/{r}/branches?filterText={branch}`
//! - Write: `PUT {server}/rest/api/1.0/projects/{p}/repos/{r}/browse/{path}` (multipart)
//!
//! Create and update are the same request. The version token is the branch's
//! latest commit, sent as `sourceCommitId` when the file already exists.

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::backend::client::PlatformClient;
use crate::backend::{BackendAdapter, BackendError, ExistenceProbe, RawResponse};
use crate::http::request::RequestContext;

/// One page of `GET .../branches`.
#[derive(Debug, Deserialize)]
struct BranchPage {
    #[serde(default)]
    values: Vec<BranchInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchInfo {
    #[serde(default)]
    latest_commit: String,
}

/// Adapter for the Bitbucket Server REST API.
#[derive(Debug, Clone)]
pub struct BitbucketAdapter {
    client: PlatformClient,
}

impl BitbucketAdapter {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    fn repo_segments<'a>(ctx: &'a RequestContext) -> [&'a str; 7] {
        [
            "rest",
            "api",
            "1.0",
            "projects",
            ctx.project.as_str(),
            "repos",
            ctx.repository.as_str(),
        ]
    }

    fn browse_url(&self, ctx: &RequestContext, query: &[(&str, &str)]) -> Result<Url, BackendError> {
        let segments = Self::repo_segments(ctx)
            .into_iter()
            .chain(["browse"])
            .chain(ctx.path_segments());
        self.client.url(segments, query)
    }
}

#[async_trait]
impl BackendAdapter for BitbucketAdapter {
    async fn fetch_raw(&self, ctx: &RequestContext) -> Result<RawResponse, BackendError> {
        let segments = ["projects", ctx.project.as_str(), "repos", ctx.repository.as_str(), "raw"]
            .into_iter()
            .chain(ctx.path_segments());
        let url = self.client.url(segments, &[("at", ctx.branch.as_str())])?;

        self.client
            .send_raw("read", self.client.request(Method::GET, url, ctx))
            .await
    }

    async fn fetch_version_token(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<String>, BackendError> {
        let segments = Self::repo_segments(ctx).into_iter().chain(["branches"]);
        let url = self.client.url(segments, &[("filterText", ctx.branch.as_str())])?;

        let response = self
            .client
            .send("branch_metadata", self.client.request(Method::GET, url, ctx))
            .await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(
                status = response.status().as_u16(),
                branch = %ctx.branch,
                "Failed to fetch branch info"
            );
            return Ok(None);
        }

        let page: BranchPage = match response.json().await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, branch = %ctx.branch, "Failed to parse branch info");
                return Ok(None);
            }
        };

        Ok(page
            .values
            .into_iter()
            .next()
            .map(|branch| branch.latest_commit)
            .filter(|commit| !commit.is_empty()))
    }

    async fn probe_existence(&self, ctx: &RequestContext) -> Result<ExistenceProbe, BackendError> {
        let url = self.browse_url(ctx, &[("at", ctx.branch.as_str())])?;
        let response = self
            .client
            .send("exists", self.client.request(Method::HEAD, url, ctx))
            .await?;

        if !response.status().is_success() {
            return Ok(ExistenceProbe::default());
        }

        let version_token = match self.fetch_version_token(ctx).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Writing without a source commit");
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
        let mut form = Form::new()
            .part("content", Part::bytes(payload.to_vec()))
            .text("branch", ctx.branch.clone())
            .text("sourceBranch", ctx.branch.clone());
        if let Some(commit) = probe.version_token {
            form = form.text("sourceCommitId", commit);
        }

        let url = self.browse_url(ctx, &[])?;
        let request = self.client.request(Method::PUT, url, ctx).multipart(form);
        self.client.send_raw("write", request).await
    }
}
