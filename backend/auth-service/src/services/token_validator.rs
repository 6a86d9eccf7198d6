//! Token validation
//!
//! Wraps the codec for callers holding an `Authorization` header value. Roles are
//! taken from the token claims, so validation never touches the user store.

use crypto_core::{Identity, InvalidReason, TokenCodec, ValidationResult};
use tracing::warn;

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone, Debug)]
pub struct TokenValidator {
    codec: TokenCodec,
}

impl TokenValidator {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Validate a full `Bearer <token>` header value.
    ///
    /// A value without the scheme prefix is `Invalid(Malformed)`, or `Invalid(Empty)`
    /// when blank.
    pub fn validate(&self, bearer_header: &str) -> ValidationResult {
        match bearer_header.strip_prefix(BEARER_PREFIX) {
            Some(raw) => self.validate_token(raw),
            None => {
                let reason = if bearer_header.trim().is_empty() {
                    InvalidReason::Empty
                } else {
                    InvalidReason::Malformed
                };
                warn!(reason = %reason, "Token validation failed: missing bearer scheme");
                ValidationResult::Invalid(reason)
            }
        }
    }

    /// Validate a raw compact token
    pub fn validate_token(&self, raw: &str) -> ValidationResult {
        let result = self.codec.verify(raw);
        if let ValidationResult::Invalid(reason) = &result {
            warn!(reason = %reason, "Token validation failed");
        }
        result
    }

    /// Identity carried by a token the caller already believes valid
    pub fn identity_of(&self, raw: &str) -> Option<Identity> {
        self.validate_token(raw).into_identity()
    }
}
