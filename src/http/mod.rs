//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, per-platform routes)
//!     → request.rs (RequestContext from path, query, Authorization)
//!     → proxy::StateProxy (remote-state protocol)
//!     → response.rs (version marker, state bytes, pass-through)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, StateQuery};
pub use response::StateResponse;
pub use server::{HttpServer, ServerError};
