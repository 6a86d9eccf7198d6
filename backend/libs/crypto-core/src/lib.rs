//! Shared token and identity primitives for PMS services
//!
//! - `identity`: `Identity` and the validated `Roles` set carried across services
//! - `secret`: the process-wide HS256 signing secret
//! - `jwt`: compact token signing and ordered verification

pub mod identity;
pub mod jwt;
pub mod secret;

pub use identity::{Identity, IdentityError, Roles, RolesError};
pub use jwt::{Claims, CodecError, InvalidReason, Token, TokenCodec, ValidationResult};
pub use secret::{SecretError, SigningSecret, MIN_SECRET_BYTES};
