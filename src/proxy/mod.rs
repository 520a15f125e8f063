//! Remote-state protocol orchestration.
//!
//! # Data Flow
//! ```text
//! GET:  fetch_raw ─▶ 200 ─▶ envelope? ─▶ decrypt ─▶ state
//!                 ─▶ 404 ─▶ {"version": 1}
//!                 ─▶ other ─▶ forwarded
//!
//! POST: body ─▶ encrypt (policy) ─▶ probe_existence ─▶ write ─▶ forwarded
//! ```
//!
//! # Design Decisions
//! - One `StateProxy` per platform route, built once at startup
//! - No retries; every failure is scoped to the request
//! - Without a cipher no envelope is ever built or parsed

use axum::body::Bytes;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::backend::{BackendAdapter, Platform, RawResponse};
use crate::config::EncryptionPolicy;
use crate::envelope::{StateCipher, StateEnvelope};
use crate::error::ProxyError;
use crate::http::request::RequestContext;
use crate::http::response::StateResponse;

impl EncryptionPolicy {
    /// Whether a write should be sealed, given the caller's `encrypt` flag.
    pub fn should_encrypt(&self, requested: bool) -> bool {
        match self {
            EncryptionPolicy::Always => true,
            EncryptionPolicy::OnRequest => requested,
        }
    }

    /// Whether a stored envelope should be opened.
    pub fn should_decrypt(&self, envelope: &StateEnvelope) -> bool {
        match self {
            EncryptionPolicy::Always => true,
            EncryptionPolicy::OnRequest => envelope.is_encrypted(),
        }
    }
}

/// Translates state requests for one platform.
#[derive(Clone)]
pub struct StateProxy {
    platform: Platform,
    adapter: Arc<dyn BackendAdapter>,
    cipher: Option<StateCipher>,
    policy: EncryptionPolicy,
}

impl StateProxy {
    pub fn new(
        platform: Platform,
        adapter: Arc<dyn BackendAdapter>,
        cipher: Option<StateCipher>,
        policy: EncryptionPolicy,
    ) -> Self {
        Self {
            platform,
            adapter,
            cipher,
            policy,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Serve a state read.
    pub async fn get(&self, ctx: &RequestContext) -> Result<StateResponse, ProxyError> {
        let raw = self.adapter.fetch_raw(ctx).await?;
        match raw.status {
            StatusCode::OK => self.open(raw),
            StatusCode::NOT_FOUND => {
                tracing::debug!(platform = %self.platform, path = %ctx.path, "No state stored yet");
                Ok(StateResponse::NoState)
            }
            status => {
                tracing::info!(
                    platform = %self.platform,
                    status = status.as_u16(),
                    "Forwarding platform read response"
                );
                Ok(StateResponse::Upstream(raw))
            }
        }
    }

    fn open(&self, raw: RawResponse) -> Result<StateResponse, ProxyError> {
        let plain = |body: Bytes| StateResponse::State {
            body,
            content_type: raw.content_type.clone(),
        };

        let Some(cipher) = &self.cipher else {
            return Ok(plain(raw.body.clone()));
        };

        match StateEnvelope::parse(&raw.body) {
            Some(envelope) if self.policy.should_decrypt(&envelope) => {
                let decrypted = cipher.decrypt(&envelope)?;
                Ok(plain(Bytes::from(decrypted)))
            }
            _ => Ok(plain(raw.body.clone())),
        }
    }

    /// Serve a state write.
    pub async fn post(&self, ctx: &RequestContext, body: Bytes) -> Result<StateResponse, ProxyError> {
        let payload = match &self.cipher {
            Some(cipher) if self.policy.should_encrypt(ctx.encrypt_requested) => {
                Bytes::from(cipher.encrypt(&body).to_json_bytes()?)
            }
            _ => body,
        };

        let probe = self.adapter.probe_existence(ctx).await?;
        tracing::debug!(
            platform = %self.platform,
            path = %ctx.path,
            exists = probe.exists,
            has_version = probe.version_token.is_some(),
            "Existence probed"
        );

        let response = self.adapter.write(ctx, payload, probe).await?;
        if !response.status.is_success() {
            tracing::info!(
                platform = %self.platform,
                status = response.status.as_u16(),
                "Platform rejected write"
            );
        }
        Ok(StateResponse::Upstream(response))
    }
}
