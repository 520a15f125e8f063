//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that platform server URLs are usable as request bases
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{PlatformConfig, ProxyConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no platform configured; add a [bitbucket] or [gitea] section")]
    NoPlatform,

    #[error("invalid {platform} server '{server}': {reason}")]
    InvalidServer {
        platform: &'static str,
        server: String,
        reason: String,
    },

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bitbucket.is_none() && config.gitea.is_none() {
        errors.push(ValidationError::NoPlatform);
    }

    for (platform, section) in [("bitbucket", &config.bitbucket), ("gitea", &config.gitea)] {
        if let Some(section) = section {
            if let Err(reason) = check_server(section) {
                errors.push(ValidationError::InvalidServer {
                    platform,
                    server: section.server.clone(),
                    reason,
                });
            }
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_server(section: &PlatformConfig) -> Result<(), String> {
    let url = Url::parse(&section.server).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.cannot_be_a_base() {
        return Err("not a base URL".to_string());
    }
    Ok(())
}
