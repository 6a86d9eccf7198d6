//! HS256 signing secret
//!
//! Loaded once at startup and shared read-only (behind `Arc`) by every codec
//! instance. There is no global holder; callers pass it in explicitly.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// HS256 needs at least a 256-bit key
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("signing secret is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("signing secret too short: {actual} bytes, minimum {}", MIN_SECRET_BYTES)]
    TooShort { actual: usize },
}

#[derive(Clone)]
pub struct SigningSecret {
    bytes: Arc<Zeroizing<Vec<u8>>>,
}

impl SigningSecret {
    /// Decode a standard base64 secret, as stored in `JWT_SECRET`
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SecretError> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(SecretError::TooShort {
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: Arc::new(bytes),
        })
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
