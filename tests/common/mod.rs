//! Shared fakes for integration testing: minimal Bitbucket Server and Gitea
//! APIs served by axum on ephemeral ports, plus a proxy launcher.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use git_state_proxy::{HttpServer, ProxyConfig, Shutdown, StateCipher};

/// Serve `router` on 127.0.0.1 with an OS-assigned port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start the proxy itself; returns its address and the shutdown handle.
pub async fn start_proxy(config: ProxyConfig, cipher: Option<StateCipher>) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config, cipher).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

fn authorization(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Fixed response returned for every call while set.
#[derive(Debug, Clone)]
pub struct Outage {
    pub status: StatusCode,
    pub body: &'static str,
}

fn outage_response(outage: &Outage) -> Response {
    (outage.status, outage.body).into_response()
}

// ---------------------------------------------------------------------------
// Bitbucket Server
// ---------------------------------------------------------------------------

/// In-memory Bitbucket repository with a single branch.
#[derive(Debug, Default)]
pub struct BitbucketRepo {
    pub files: HashMap<String, Vec<u8>>,
    /// Latest commit number of the branch; 0 means no commits yet.
    pub head: u32,
    /// Form fields of every PUT, in order.
    pub puts: Vec<HashMap<String, String>>,
    pub branch_queries: Vec<String>,
    pub authorizations: Vec<String>,
    pub outage: Option<Outage>,
}

impl BitbucketRepo {
    pub fn head_commit(&self) -> String {
        format!("commit-{}", self.head)
    }
}

pub type SharedBitbucket = Arc<Mutex<BitbucketRepo>>;

pub async fn start_fake_bitbucket() -> (SocketAddr, SharedBitbucket) {
    let repo = SharedBitbucket::default();
    let router = Router::new()
        .route("/projects/{project}/repos/{repo}/raw/{*path}", get(bitbucket_raw))
        .route(
            "/rest/api/1.0/projects/{project}/repos/{repo}/browse/{*path}",
            get(bitbucket_browse).put(bitbucket_put),
        )
        .route(
            "/rest/api/1.0/projects/{project}/repos/{repo}/branches",
            get(bitbucket_branches),
        )
        .with_state(repo.clone());
    (serve(router).await, repo)
}

async fn bitbucket_raw(
    State(repo): State<SharedBitbucket>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    if let Some(outage) = &repo.outage {
        return outage_response(outage);
    }
    match repo.files.get(&path) {
        Some(content) => (
            StatusCode::OK,
            [("content-type", "text/plain;charset=UTF-8")],
            content.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "{\"errors\":[]}").into_response(),
    }
}

async fn bitbucket_browse(
    State(repo): State<SharedBitbucket>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    if repo.files.contains_key(&path) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
struct BranchFilter {
    #[serde(rename = "filterText", default)]
    filter_text: String,
}

async fn bitbucket_branches(
    State(repo): State<SharedBitbucket>,
    Query(filter): Query<BranchFilter>,
) -> Json<serde_json::Value> {
    let mut repo = repo.lock().unwrap();
    repo.branch_queries.push(filter.filter_text.clone());
    Json(serde_json::json!({
        "size": 1,
        "limit": 25,
        "isLastPage": true,
        "start": 0,
        "values": [{
            "id": format!("refs/heads/{}", filter.filter_text),
            "displayId": filter.filter_text,
            "type": "BRANCH",
            "latestCommit": repo.head_commit(),
            "latestChangeset": repo.head_commit(),
            "isDefault": true
        }]
    }))
}

async fn bitbucket_put(
    State(repo): State<SharedBitbucket>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.unwrap();
        fields.insert(name, value);
    }

    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    repo.puts.push(fields.clone());
    if let Some(outage) = &repo.outage {
        return outage_response(outage);
    }

    let exists = repo.files.contains_key(&path);
    match fields.get("sourceCommitId") {
        Some(commit) if *commit != repo.head_commit() => {
            return (StatusCode::CONFLICT, "{\"errors\":[{\"message\":\"stale commit\"}]}")
                .into_response();
        }
        None if exists => {
            return (StatusCode::CONFLICT, "{\"errors\":[{\"message\":\"file exists\"}]}")
                .into_response();
        }
        _ => {}
    }

    let content = fields.get("content").cloned().unwrap_or_default();
    repo.files.insert(path, content.into_bytes());
    repo.head += 1;
    Json(serde_json::json!({ "id": repo.head_commit() })).into_response()
}

// ---------------------------------------------------------------------------
// Gitea
// ---------------------------------------------------------------------------

/// One recorded create/update call.
#[derive(Debug, Clone)]
pub struct GiteaWrite {
    pub method: String,
    pub body: serde_json::Value,
}

/// In-memory Gitea repository.
#[derive(Debug, Default)]
pub struct GiteaRepo {
    /// path → (content, revision)
    pub files: HashMap<String, (Vec<u8>, u32)>,
    pub writes: Vec<GiteaWrite>,
    pub refs: Vec<String>,
    pub authorizations: Vec<String>,
    pub outage: Option<Outage>,
    /// Paths served with `"content": null`, as Gitea does above its blob size limit.
    pub oversized: HashSet<String>,
}

pub fn gitea_sha(revision: u32) -> String {
    format!("sha-{}", revision)
}

pub type SharedGitea = Arc<Mutex<GiteaRepo>>;

pub async fn start_fake_gitea() -> (SocketAddr, SharedGitea) {
    let repo = SharedGitea::default();
    let router = Router::new()
        .route(
            "/api/v1/repos/{owner}/{repo}/contents/{*path}",
            get(gitea_get).post(gitea_create).put(gitea_update),
        )
        .with_state(repo.clone());
    (serve(router).await, repo)
}

#[derive(Deserialize)]
struct RefQuery {
    #[serde(rename = "ref", default)]
    reference: String,
}

/// Base64 wrapped at 60 columns, like Gitea's responses.
fn wrapped_base64(content: &[u8]) -> String {
    STANDARD
        .encode(content)
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn gitea_get(
    State(repo): State<SharedGitea>,
    Path((_, _, path)): Path<(String, String, String)>,
    Query(query): Query<RefQuery>,
    headers: HeaderMap,
) -> Response {
    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    repo.refs.push(query.reference);
    if let Some(outage) = &repo.outage {
        return outage_response(outage);
    }
    let withheld = repo.oversized.contains(&path);
    match repo.files.get(&path) {
        Some((content, revision)) => {
            let (encoding, inline) = if withheld {
                (None, None)
            } else {
                (Some("base64"), Some(wrapped_base64(content)))
            };
            Json(serde_json::json!({
                "name": path.rsplit('/').next().unwrap_or_default(),
                "path": path.clone(),
                "sha": gitea_sha(*revision),
                "last_commit_sha": format!("commit-{}", revision),
                "type": "file",
                "size": content.len(),
                "encoding": encoding,
                "content": inline,
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "GetContentsOrList", "errors": [] })),
        )
            .into_response(),
    }
}

fn decode_write(body: &serde_json::Value) -> Vec<u8> {
    STANDARD
        .decode(body["content"].as_str().unwrap_or_default())
        .unwrap()
}

async fn gitea_create(
    State(repo): State<SharedGitea>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    repo.writes.push(GiteaWrite {
        method: "POST".into(),
        body: body.clone(),
    });
    if repo.files.contains_key(&path) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "{\"message\":\"repository file already exists\"}",
        )
            .into_response();
    }
    repo.files.insert(path, (decode_write(&body), 1));
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "content": { "sha": gitea_sha(1) } })),
    )
        .into_response()
}

async fn gitea_update(
    State(repo): State<SharedGitea>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let mut repo = repo.lock().unwrap();
    repo.authorizations.push(authorization(&headers));
    repo.writes.push(GiteaWrite {
        method: "PUT".into(),
        body: body.clone(),
    });

    let current = match repo.files.get(&path) {
        Some((_, revision)) => *revision,
        None => {
            return (StatusCode::NOT_FOUND, "{\"message\":\"file does not exist\"}")
                .into_response()
        }
    };
    if body["sha"].as_str() != Some(gitea_sha(current).as_str()) {
        return (StatusCode::CONFLICT, "{\"message\":\"sha does not match\"}").into_response();
    }

    let next = current + 1;
    repo.files.insert(path, (decode_write(&body), next));
    Json(serde_json::json!({ "content": { "sha": gitea_sha(next) } })).into_response()
}
