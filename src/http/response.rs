//! Response construction for state routes.
//!
//! # Responsibilities
//! - Render the "no state yet" marker
//! - Return state bytes with the platform's content type
//! - Forward platform responses unchanged (status, body, content type)

use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::RawResponse;

/// Outcome of a state request, before rendering.
#[derive(Debug, Clone)]
pub enum StateResponse {
    /// Nothing stored yet: `200 {"version": 1}`.
    NoState,
    /// Stored state (decrypted when it was an envelope).
    State {
        body: Bytes,
        content_type: Option<HeaderValue>,
    },
    /// A platform response forwarded verbatim.
    Upstream(RawResponse),
}

impl IntoResponse for StateResponse {
    fn into_response(self) -> Response {
        match self {
            StateResponse::NoState => {
                (StatusCode::OK, Json(serde_json::json!({ "version": 1 }))).into_response()
            }
            StateResponse::State { body, content_type } => {
                with_content_type(StatusCode::OK, body, content_type)
            }
            StateResponse::Upstream(raw) => with_content_type(raw.status, raw.body, raw.content_type),
        }
    }
}

fn with_content_type(status: StatusCode, body: Bytes, content_type: Option<HeaderValue>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

/// Catch-all for unsupported methods and unknown routes.
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
