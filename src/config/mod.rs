//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.toml (explicit path or first existing candidate)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → platform adapters built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_candidates, discover_config, load_config, ConfigError};
pub use schema::{
    EncryptionConfig, EncryptionPolicy, ListenerConfig, ObservabilityConfig, PlatformConfig,
    ProxyConfig, TimeoutConfig,
};
