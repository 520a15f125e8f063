//! Envelope wire format and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An encrypted state payload as stored in the repository.
///
/// Both fields are required, so an ordinary JSON state document never
/// parses as an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Base64 initialization vector (one cipher block).
    #[serde(rename = "aes_iv")]
    pub iv_base64: String,

    /// Base64 ciphertext.
    #[serde(rename = "encrypted")]
    pub cipher_text_base64: String,
}

impl StateEnvelope {
    /// Try to read `bytes` as an envelope. `None` means the payload is plain.
    ///
    /// Only a JSON object qualifies; a two-element array would otherwise
    /// satisfy the derived deserializer.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<serde_json::Value>(bytes).ok()? {
            value @ serde_json::Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Whether the envelope carries an IV, i.e. was actually produced by encryption.
    pub fn is_encrypted(&self) -> bool {
        !self.iv_base64.is_empty()
    }

    /// Serialize the way envelopes are stored: two-space indented JSON.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec_pretty(self).map_err(|e| EnvelopeError::Encode(e.to_string()))
    }
}

/// Errors produced while sealing or opening an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Envelope fields cannot be decoded or have the wrong shape.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Ciphertext decrypted to something without valid padding.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Envelope could not be serialized.
    #[error("envelope encoding failed: {0}")]
    Encode(String),
}
