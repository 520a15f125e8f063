//! Remote-state HTTP proxy storing state files in Git repositories.

// Core subsystems
pub mod backend;
pub mod config;
pub mod envelope;
pub mod http;
pub mod proxy;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use envelope::StateCipher;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
