//! Sealing of authorization codes.
//!
//! A code is `base64url(nonce || ciphertext || tag)` where the ciphertext is the
//! JSON payload encrypted with AES-256-GCM under a key derived from the process
//! secret. Anyone without the secret can neither read a code nor mint one.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};

use crate::secret::{derive_key, AUTHORIZATION_CODE_PURPOSE};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not base64, or too short to hold a nonce and tag
    #[error("malformed code")]
    Malformed,

    /// Authentication failed: wrong secret or tampered ciphertext
    #[error("code failed integrity check")]
    Integrity,

    /// Authenticated, but the plaintext is not the expected payload
    #[error("invalid code payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("failed to seal code")]
    Seal,
}

/// Seals and opens authorization code payloads.
#[derive(Clone)]
pub struct CodeCodec {
    cipher: Aes256Gcm,
}

impl CodeCodec {
    pub fn from_secret(secret: &[u8]) -> Self {
        let key_bytes = derive_key(secret, AUTHORIZATION_CODE_PURPOSE);
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn seal<T: Serialize>(&self, payload: &T) -> Result<String, CodecError> {
        let plaintext = serde_json::to_vec(payload).map_err(CodecError::Payload)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| CodecError::Seal)?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(&combined))
    }

    pub fn open<T: DeserializeOwned>(&self, code: &str) -> Result<T, CodecError> {
        let combined = URL_SAFE_NO_PAD
            .decode(code)
            .map_err(|_| CodecError::Malformed)?;
        if combined.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Malformed);
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Integrity)?;

        serde_json::from_slice(&plaintext).map_err(CodecError::Payload)
    }
}
