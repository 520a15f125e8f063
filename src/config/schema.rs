//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the state proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Bitbucket Server platform. Routes under `/bitbucket` are mounted only when set.
    pub bitbucket: Option<PlatformConfig>,

    /// Gitea platform. Routes under `/gitea` are mounted only when set.
    pub gitea: Option<PlatformConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Where the shared encryption secret comes from.
    pub encryption: EncryptionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One Git hosting platform the proxy stores state in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Base server URL (e.g., "https://bitbucket.example.com").
    pub server: String,

    /// When state written through this platform is encrypted.
    /// Defaults differ per platform; see [`PlatformConfig::bitbucket_policy`] and [`PlatformConfig::gitea_policy`].
    pub encryption: Option<EncryptionPolicy>,
}

impl PlatformConfig {
    /// Effective policy for the Bitbucket routes.
    pub fn bitbucket_policy(&self) -> EncryptionPolicy {
        self.encryption.unwrap_or(EncryptionPolicy::Always)
    }

    /// Effective policy for the Gitea routes.
    pub fn gitea_policy(&self) -> EncryptionPolicy {
        self.encryption.unwrap_or(EncryptionPolicy::OnRequest)
    }
}

/// Encryption opt-in policy of a platform route.
///
/// Both policies require the shared secret to be present. Without it
/// the proxy never builds or parses envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPolicy {
    /// Encrypt every write; decrypt every stored envelope.
    Always,
    /// Encrypt only writes that carry `?encrypt=yes`; decrypt only envelopes
    /// whose IV is non-empty.
    OnRequest,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Encryption secret source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Environment variable holding the shared secret.
    pub key_env: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_env: "TF_STATE_ENCRYPTION_KEY".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
