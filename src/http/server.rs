//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build one platform adapter and orchestrator per configured platform
//! - Create the Axum router for the remote-state routes
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Serve until the shutdown signal fires

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::{BackendAdapter, BitbucketAdapter, GiteaAdapter, Platform, PlatformClient};
use crate::config::{EncryptionPolicy, ProxyConfig};
use crate::envelope::StateCipher;
use crate::http::request::{RequestContext, StateQuery};
use crate::http::response::method_not_allowed;
use crate::observability::metrics;
use crate::proxy::StateProxy;

/// Largest accepted state upload.
pub const MAX_STATE_BYTES: usize = 32 * 1024 * 1024;

/// Errors building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid {platform} server URL '{server}': {source}")]
    ServerUrl {
        platform: Platform,
        server: String,
        source: url::ParseError,
    },
}

/// HTTP server for the state proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server. `cipher` is the shared secret, if one is configured.
    pub fn new(config: ProxyConfig, cipher: Option<StateCipher>) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder().build()?;

        let mut proxies = Vec::new();
        if let Some(section) = &config.bitbucket {
            let client = platform_client(&http, &section.server, Platform::Bitbucket)?;
            proxies.push(StateProxy::new(
                Platform::Bitbucket,
                Arc::new(BitbucketAdapter::new(client)),
                cipher.clone(),
                section.bitbucket_policy(),
            ));
        }
        if let Some(section) = &config.gitea {
            let client = platform_client(&http, &section.server, Platform::Gitea)?;
            proxies.push(StateProxy::new(
                Platform::Gitea,
                Arc::new(GiteaAdapter::new(client)),
                cipher.clone(),
                section.gitea_policy(),
            ));
        }

        let router = Self::build_router(&config, proxies);
        Ok(Self { router, config })
    }

    /// Create a server around prebuilt adapters.
    pub fn with_adapters(
        config: ProxyConfig,
        adapters: Vec<(Platform, Arc<dyn BackendAdapter>, EncryptionPolicy)>,
        cipher: Option<StateCipher>,
    ) -> Self {
        let proxies = adapters
            .into_iter()
            .map(|(platform, adapter, policy)| {
                StateProxy::new(platform, adapter, cipher.clone(), policy)
            })
            .collect();
        let router = Self::build_router(&config, proxies);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, proxies: Vec<StateProxy>) -> Router {
        let mut router = Router::new();
        for proxy in proxies {
            tracing::info!(platform = %proxy.platform(), "Mounting state routes");
            let prefix = format!("/{}", proxy.platform());
            router = router.nest(&prefix, state_routes(proxy));
        }

        router
            .fallback(method_not_allowed)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(MAX_STATE_BYTES))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn platform_client(
    http: &reqwest::Client,
    server: &str,
    platform: Platform,
) -> Result<PlatformClient, ServerError> {
    PlatformClient::new(http.clone(), server, platform).map_err(|source| ServerError::ServerUrl {
        platform,
        server: server.to_string(),
        source,
    })
}

/// Routes for one platform. The partial routes exist so a missing repository
/// or path is reported as a malformed request rather than an unknown route.
///
/// `get` would also answer HEAD, so HEAD is rejected explicitly.
fn state_routes(proxy: StateProxy) -> Router {
    let methods = || -> MethodRouter<Arc<StateProxy>> {
        get(get_state)
            .head(method_not_allowed)
            .post(post_state)
            .fallback(method_not_allowed)
    };

    Router::new()
        .route("/{project}/{repository}/{*path}", methods())
        .route("/{project}/{repository}/", methods())
        .route("/{project}/{repository}", methods())
        .route("/{project}/", methods())
        .route("/{project}", methods())
        .with_state(Arc::new(proxy))
}

async fn get_state(
    State(proxy): State<Arc<StateProxy>>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<StateQuery>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let response = match RequestContext::parse(&params, &query, &headers) {
        Ok(ctx) => {
            tracing::debug!(
                platform = %proxy.platform(),
                project = %ctx.project,
                repository = %ctx.repository,
                path = %ctx.path,
                branch = %ctx.branch,
                "GET state"
            );
            proxy.get(&ctx).await.into_response()
        }
        Err(e) => e.into_response(),
    };

    metrics::record_request(proxy.platform().as_str(), "GET", response.status().as_u16(), start);
    response
}

async fn post_state(
    State(proxy): State<Arc<StateProxy>>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<StateQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let response = match RequestContext::parse(&params, &query, &headers) {
        Ok(ctx) => {
            tracing::debug!(
                platform = %proxy.platform(),
                project = %ctx.project,
                repository = %ctx.repository,
                path = %ctx.path,
                branch = %ctx.branch,
                encrypt = ctx.encrypt_requested,
                bytes = body.len(),
                "POST state"
            );
            proxy.post(&ctx, body).await.into_response()
        }
        Err(e) => e.into_response(),
    };

    metrics::record_request(proxy.platform().as_str(), "POST", response.status().as_u16(), start);
    response
}
