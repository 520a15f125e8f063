//! Encryption envelope for stored state.
//!
//! # Data Flow
//! ```text
//! POST body ─▶ StateCipher::encrypt ─▶ StateEnvelope ─▶ pretty JSON ─▶ backend
//! backend ─▶ StateEnvelope::parse ─┬─▶ Some(envelope) ─▶ StateCipher::decrypt ─▶ client
//!                                  └─▶ None ─▶ plain state, returned unchanged
//! ```
//!
//! # Design Decisions
//! - The secret is hashed once at startup; the cipher is cheap to clone
//! - Envelope detection is a structural parse, not a marker byte
//! - Confidentiality only; no tamper detection

pub mod cipher;
pub mod types;

pub use cipher::{decrypt, encrypt, StateCipher, BLOCK_SIZE};
pub use types::{EnvelopeError, StateEnvelope};
