//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("No configuration file found (searched: {})", join_paths(.0))]
    NotFound(Vec<PathBuf>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ProxyConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Standard places a `config.toml` is looked up, in priority order:
/// the working directory, the executable's directory, then `/etc/tfstate`.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("config.toml"));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join("config.toml"));
    }
    candidates.push(PathBuf::from("/etc/tfstate/config.toml"));
    candidates
}

/// Load the first candidate that exists.
///
/// Missing files are skipped. An existing file that fails to parse or
/// validate stops the search with its error.
pub fn discover_config(candidates: &[PathBuf]) -> Result<(PathBuf, ProxyConfig), ConfigError> {
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let config = load_config(path)?;
        return Ok((path.clone(), config));
    }
    Err(ConfigError::NotFound(candidates.to_vec()))
}
