//! Compact token codec for PMS services
//!
//! Tokens are standard three-segment JWTs (`header.claims.signature`) signed with
//! HS256 over a shared process secret. Claims are self-describing: subject,
//! comma-joined roles, `iat` and `exp`, so validation needs no external state.
//!
//! ## Verification order
//!
//! Checks short-circuit in a fixed order and exactly one reason is reported:
//!
//! 1. empty input                        -> `InvalidReason::Empty`
//! 2. segment / base64 / JSON structure  -> `InvalidReason::Malformed`
//! 3. header `alg` / `typ` not HS256 JWT -> `InvalidReason::Unsupported`
//! 4. HMAC over `header.claims`          -> `InvalidReason::BadSignature`
//! 5. `now >= exp`                        -> `InvalidReason::Expired`
//!
//! Timestamps have one-second resolution (RFC 7519 NumericDate). `issued_at` is
//! truncated to whole seconds at signing time, so the returned `Token` and the
//! encoded claims always agree.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use crypto_core::{Identity, Roles, SigningSecret, TokenCodec};
//!
//! let secret = SigningSecret::from_bytes(vec![42u8; 32]).unwrap();
//! let codec = TokenCodec::new(&secret);
//! let identity = Identity::new("admin@pms.com", Roles::single("ADMIN").unwrap()).unwrap();
//!
//! let token = codec.sign(&identity, Utc::now(), Duration::hours(1)).unwrap();
//! assert!(codec.verify(token.compact()).is_valid());
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{crypto, encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::identity::{Identity, Roles};
use crate::secret::SigningSecret;

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - HS256 with the shared signing secret
pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

const ALGORITHM_NAME: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

// ============================================================================
// Data Structures
// ============================================================================

/// Claims embedded in every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Comma-joined role names
    pub roles: String,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

/// An issued token. Immutable; ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    compact: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn into_compact(self) -> String {
        self.compact
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    Empty,
    Malformed,
    Unsupported,
    BadSignature,
    Expired,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Empty => "empty",
            InvalidReason::Malformed => "malformed",
            InvalidReason::Unsupported => "unsupported",
            InvalidReason::BadSignature => "bad_signature",
            InvalidReason::Expired => "expired",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(Identity),
    Invalid(InvalidReason),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ValidationResult::Valid(identity) => Some(identity),
            ValidationResult::Invalid(_) => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            ValidationResult::Valid(identity) => Some(identity),
            ValidationResult::Invalid(_) => None,
        }
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("token ttl must be at least one second")]
    InvalidTtl,

    #[error("token timestamp out of range")]
    TimestampOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and verifies tokens with one signing secret. Cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
        }
    }

    /// Sign `identity` as issued at `issued_at`, valid for `ttl`.
    ///
    /// Sub-second parts of `issued_at` and `ttl` are dropped.
    ///
    /// ## Errors
    ///
    /// - `CodecError::InvalidTtl` if `ttl` is shorter than one second
    /// - `CodecError::TimestampOutOfRange` if `issued_at + ttl` overflows
    pub fn sign(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Token, CodecError> {
        let ttl_secs = ttl.num_seconds();
        if ttl_secs < 1 {
            return Err(CodecError::InvalidTtl);
        }

        let iat = issued_at.timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or(CodecError::TimestampOutOfRange)?;

        let claims = Claims {
            sub: identity.subject().to_string(),
            roles: identity.roles().to_csv(),
            iat,
            exp,
        };

        let compact = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)?;

        Ok(Token {
            compact,
            issued_at: timestamp(iat).ok_or(CodecError::TimestampOutOfRange)?,
            expires_at: timestamp(exp).ok_or(CodecError::TimestampOutOfRange)?,
        })
    }

    /// Verify against the current wall clock
    pub fn verify(&self, compact: &str) -> ValidationResult {
        self.verify_at(compact, Utc::now())
    }

    /// Verify as of `now`. Pure function of (secret, input, now).
    pub fn verify_at(&self, compact: &str, now: DateTime<Utc>) -> ValidationResult {
        match self.check(compact, now) {
            Ok(identity) => ValidationResult::Valid(identity),
            Err(reason) => {
                debug!(reason = %reason, "Token verification failed");
                ValidationResult::Invalid(reason)
            }
        }
    }

    fn check(&self, compact: &str, now: DateTime<Utc>) -> Result<Identity, InvalidReason> {
        let compact = compact.trim();
        if compact.is_empty() {
            return Err(InvalidReason::Empty);
        }

        // 1. Structure
        let segments = Segments::split(compact).ok_or(InvalidReason::Malformed)?;
        let header: serde_json::Map<String, serde_json::Value> = decode_segment(segments.header)?;
        let claims: Claims = decode_segment(segments.claims)?;
        URL_SAFE_NO_PAD
            .decode(segments.signature)
            .map_err(|_| InvalidReason::Malformed)?;

        if claims.exp <= claims.iat {
            return Err(InvalidReason::Malformed);
        }
        let roles = Roles::parse_csv(&claims.roles).map_err(|_| InvalidReason::Malformed)?;
        let identity = Identity::new(claims.sub, roles).map_err(|_| InvalidReason::Malformed)?;

        // 2. Encoding version
        let alg = header.get("alg").and_then(|v| v.as_str());
        let typ = header.get("typ").map(|v| v.as_str());
        if alg != Some(ALGORITHM_NAME) || !matches!(typ, None | Some(Some(TOKEN_TYPE))) {
            return Err(InvalidReason::Unsupported);
        }

        // 3. Signature (constant-time comparison inside jsonwebtoken)
        match crypto::verify(
            segments.signature,
            segments.message.as_bytes(),
            &self.decoding_key,
            JWT_ALGORITHM,
        ) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(InvalidReason::BadSignature),
        }

        // 4. Expiry
        if now.timestamp() >= claims.exp {
            return Err(InvalidReason::Expired);
        }

        Ok(identity)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &JWT_ALGORITHM)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

struct Segments<'a> {
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
    /// `header.claims`, the signed input
    message: &'a str,
}

impl<'a> Segments<'a> {
    fn split(compact: &'a str) -> Option<Self> {
        let (message, signature) = compact.rsplit_once('.')?;
        let (header, claims) = message.split_once('.')?;
        if header.is_empty() || claims.is_empty() || claims.contains('.') {
            return None;
        }
        Some(Self {
            header,
            claims,
            signature,
            message,
        })
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, InvalidReason> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| InvalidReason::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| InvalidReason::Malformed)
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

// ============================================================================
// Tests
// ============================================================================
