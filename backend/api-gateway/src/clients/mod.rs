//! Clients for services the gateway depends on

pub mod auth_client;

pub use auth_client::{RemoteTokenValidator, TokenValidator, ValidatorError, VerifiedIdentity};

#[cfg(test)]
pub use auth_client::MockTokenValidator;
