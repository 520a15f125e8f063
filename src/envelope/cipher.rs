//! AES-256-CBC sealing of state payloads.
//!
//! The key is the SHA-256 digest of the shared secret. Every seal draws a
//! fresh random IV and applies PKCS#7 padding. There is no authentication
//! tag: a wrong key is only noticed when the padding happens to be invalid.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::envelope::types::{EnvelopeError, StateEnvelope};

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// AES block size in bytes; also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Symmetric cipher keyed from the shared secret.
#[derive(Clone)]
pub struct StateCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for StateCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCipher").finish_non_exhaustive()
    }
}

impl StateCipher {
    /// Derive the 32-byte key from a secret of any length.
    pub fn from_secret(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Build a cipher from the secret held in environment variable `var`, if set.
    pub fn from_env(var: &str) -> Option<Self> {
        let secret = std::env::var(var).ok()?;
        if secret.is_empty() {
            tracing::warn!(env = %var, "Encryption secret is set but empty");
        }
        Some(Self::from_secret(&secret))
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> StateEnvelope {
        let mut iv = [0u8; BLOCK_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext =
            Encryptor::new(&self.key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        StateEnvelope {
            iv_base64: STANDARD.encode(iv),
            cipher_text_base64: STANDARD.encode(ciphertext),
        }
    }

    /// Recover the plaintext sealed in `envelope`.
    pub fn decrypt(&self, envelope: &StateEnvelope) -> Result<Vec<u8>, EnvelopeError> {
        let iv = STANDARD
            .decode(&envelope.iv_base64)
            .map_err(|e| EnvelopeError::InvalidEnvelope(format!("IV is not base64: {}", e)))?;
        let ciphertext = STANDARD.decode(&envelope.cipher_text_base64).map_err(|e| {
            EnvelopeError::InvalidEnvelope(format!("ciphertext is not base64: {}", e))
        })?;

        if iv.len() != BLOCK_SIZE {
            return Err(EnvelopeError::InvalidEnvelope(format!(
                "IV must be {} bytes, got {}",
                BLOCK_SIZE,
                iv.len()
            )));
        }
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(EnvelopeError::CorruptPayload(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK_SIZE
            )));
        }

        Decryptor::new_from_slices(&self.key, &iv)
            .map_err(|e| EnvelopeError::InvalidEnvelope(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| EnvelopeError::CorruptPayload("invalid padding".to_string()))
    }
}

/// Encrypt `plaintext` with a key derived from `secret`.
pub fn encrypt(secret: &str, plaintext: &[u8]) -> StateEnvelope {
    StateCipher::from_secret(secret).encrypt(plaintext)
}

/// Decrypt `envelope` with a key derived from `secret`.
pub fn decrypt(secret: &str, envelope: &StateEnvelope) -> Result<Vec<u8>, EnvelopeError> {
    StateCipher::from_secret(secret).decrypt(envelope)
}
