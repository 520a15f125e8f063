//! Outbound HTTP client shared by the platform adapters.
//!
//! # Responsibilities
//! - Build platform URLs from the configured server and path segments
//! - Forward the caller's Authorization header
//! - Log and count every outbound call
//! - Turn transport failures into `BackendError::Transport`

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use url::Url;

use crate::backend::{BackendError, Platform, RawResponse};
use crate::http::request::RequestContext;
use crate::observability::metrics;

/// HTTP client bound to one platform server.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base: Url,
    platform: Platform,
}

impl PlatformClient {
    /// Bind `http` to `server`. Trailing slashes on the server are ignored.
    pub fn new(
        http: reqwest::Client,
        server: &str,
        platform: Platform,
    ) -> Result<Self, url::ParseError> {
        let base = Url::parse(server.trim_end_matches('/'))?;
        Ok(Self {
            http,
            base,
            platform,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Server URL extended with `segments` (each percent-encoded) and `query`.
    pub fn url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
        query: &[(&str, &str)],
    ) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::Transport(format!("server URL {} cannot be a base", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Start a request carrying the caller's credentials.
    pub fn request(&self, method: Method, url: Url, ctx: &RequestContext) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &ctx.authorization {
            Some(value) => builder.header(AUTHORIZATION, value.clone()),
            None => builder,
        }
    }

    /// Execute a request built by [`PlatformClient::request`].
    pub async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::debug!(
            platform = %self.platform,
            operation,
            method = %method,
            url = %url,
            "Initiating backend request"
        );

        match self.http.execute(request).await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(
                    platform = %self.platform,
                    operation,
                    status = status.as_u16(),
                    "Backend request completed"
                );
                metrics::record_backend_call(self.platform.as_str(), operation, status.as_str());
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    platform = %self.platform,
                    operation,
                    method = %method,
                    url = %url,
                    error = %e,
                    "Backend request failed"
                );
                metrics::record_backend_call(self.platform.as_str(), operation, "error");
                Err(e.into())
            }
        }
    }

    /// Execute and buffer the whole response.
    pub async fn send_raw(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<RawResponse, BackendError> {
        let response = self.send(operation, builder).await?;
        read_raw(response).await
    }
}

/// Buffer a response into a [`RawResponse`].
pub async fn read_raw(response: reqwest::Response) -> Result<RawResponse, BackendError> {
    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let body = response.bytes().await?;
    Ok(RawResponse {
        status,
        body,
        content_type,
    })
}
