//! Inbound request parsing.
//!
//! # Responsibilities
//! - Extract project, repository and state path from the route
//! - Read `branch` and `encrypt` query parameters
//! - Capture the `Authorization` header for verbatim forwarding
//!
//! # Design Decisions
//! - The proxy authenticates nothing itself; credentials are relayed
//! - One leading `/` is stripped so absolute and relative paths address the same file

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ProxyError;

/// Query parameters understood on state routes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateQuery {
    pub branch: String,
    pub encrypt: String,
}

/// Everything a backend adapter needs to address one state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub project: String,
    pub repository: String,
    /// Path inside the repository, never with a leading separator.
    pub path: String,
    pub branch: String,
    /// Forwarded byte for byte; `None` when the caller sent none.
    pub authorization: Option<HeaderValue>,
    pub encrypt_requested: bool,
}

impl RequestContext {
    /// Build a context from route parameters, query and headers.
    pub fn parse(
        params: &HashMap<String, String>,
        query: &StateQuery,
        headers: &HeaderMap,
    ) -> Result<Self, ProxyError> {
        let project = required(params, "project")?;
        let repository = required(params, "repository")?;
        let raw_path = params.get("path").map(String::as_str).unwrap_or_default();
        let path = raw_path.strip_prefix('/').unwrap_or(raw_path);
        if path.is_empty() {
            return Err(ProxyError::MalformedRequest("missing state path".to_string()));
        }

        Ok(Self {
            project,
            repository,
            path: path.to_string(),
            branch: query.branch.clone(),
            authorization: headers.get(AUTHORIZATION).cloned(),
            encrypt_requested: query.encrypt == "yes",
        })
    }

    /// Path split into URL segments.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }
}

fn required(params: &HashMap<String, String>, name: &str) -> Result<String, ProxyError> {
    params
        .get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ProxyError::MalformedRequest(format!("missing {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn params(path: Option<&str>) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("project".to_string(), "infra".to_string());
        map.insert("repository".to_string(), "states".to_string());
        if let Some(path) = path {
            map.insert("path".to_string(), path.to_string());
        }
        map
    }

    fn query(branch: &str, encrypt: &str) -> StateQuery {
        StateQuery {
            branch: branch.into(),
            encrypt: encrypt.into(),
        }
    }

    #[test]
    fn test_parse_full_request() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        let ctx = RequestContext::parse(
            &params(Some("env/prod.tfstate")),
            &query("main", "yes"),
            &headers,
        )
        .unwrap();

        assert_eq!(ctx.project, "infra");
        assert_eq!(ctx.repository, "states");
        assert_eq!(ctx.path, "env/prod.tfstate");
        assert_eq!(ctx.branch, "main");
        assert_eq!(ctx.authorization, Some(HeaderValue::from_static("Bearer abc")));
        assert!(ctx.encrypt_requested);
        assert_eq!(
            ctx.path_segments().collect::<Vec<_>>(),
            vec!["env", "prod.tfstate"]
        );
    }

    #[test]
    fn test_leading_separator_stripped_once() {
        let headers = HeaderMap::new();
        let absolute =
            RequestContext::parse(&params(Some("/a/b.tfstate")), &query("", ""), &headers).unwrap();
        let relative =
            RequestContext::parse(&params(Some("a/b.tfstate")), &query("", ""), &headers).unwrap();
        assert_eq!(absolute.path, relative.path);

        let double =
            RequestContext::parse(&params(Some("//a.tfstate")), &query("", ""), &headers).unwrap();
        assert_eq!(double.path, "/a.tfstate");
    }

    #[test]
    fn test_encrypt_flag_must_be_yes() {
        let headers = HeaderMap::new();
        for flag in ["", "no", "true", "YES"] {
            let ctx =
                RequestContext::parse(&params(Some("s.tfstate")), &query("main", flag), &headers)
                    .unwrap();
            assert!(!ctx.encrypt_requested, "flag {:?}", flag);
        }
    }

    #[test]
    fn test_missing_components_rejected() {
        let headers = HeaderMap::new();
        let q = query("main", "");

        assert!(matches!(
            RequestContext::parse(&params(None), &q, &headers),
            Err(ProxyError::MalformedRequest(_))
        ));
        assert!(matches!(
            RequestContext::parse(&params(Some("/")), &q, &headers),
            Err(ProxyError::MalformedRequest(_))
        ));

        let mut no_project = params(Some("s.tfstate"));
        no_project.remove("project");
        assert!(matches!(
            RequestContext::parse(&no_project, &q, &headers),
            Err(ProxyError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_missing_authorization_is_none() {
        let ctx = RequestContext::parse(
            &params(Some("s.tfstate")),
            &StateQuery::default(),
            &HeaderMap::new(),
        )
        .unwrap();
        assert!(ctx.authorization.is_none());
        assert!(ctx.branch.is_empty());
    }

    #[test]
    fn test_opaque_authorization_kept_verbatim() {
        let raw = b"Basic \xe9t\xe9:pass";
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(raw).unwrap());

        let ctx = RequestContext::parse(&params(Some("s.tfstate")), &query("main", ""), &headers)
            .unwrap();
        assert_eq!(ctx.authorization.unwrap().as_bytes(), raw);
    }
}
