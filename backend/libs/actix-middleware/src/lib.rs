//! # Actix Middleware Library
//!
//! Shared middleware components for PMS Actix services
//!
//! ## Modules
//! - `trust_headers`: the reserved gateway-to-service identity header namespace
//! - `header_auth`: downstream trust filter and the `AuthenticatedUser` extractor
//! - `logging`: per-request tracing middleware

pub mod header_auth;
pub mod logging;
pub mod trust_headers;

pub use header_auth::{AuthenticatedUser, AuthzError, TrustedHeaderAuth};
pub use logging::RequestLogging;
pub use trust_headers::{EMAIL_HEADER, ROLES_HEADER};
