//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handlers and platform adapters produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every inbound request span
//! - Credentials and the encryption secret are never recorded

pub mod logging;
pub mod metrics;
