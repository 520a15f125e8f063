//! Request-scoped proxy errors.
//!
//! Every variant is scoped to one inbound request and is reported to the
//! caller as `400 Bad Request` with the error text as body. Non-2xx platform
//! responses are not errors; they are forwarded as-is.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::envelope::EnvelopeError;

/// Errors that end the handling of a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Project, repository or path missing, or an unusable header.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// An outbound platform call could not be completed or understood.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Envelope could not be opened or built.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Request failed");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
