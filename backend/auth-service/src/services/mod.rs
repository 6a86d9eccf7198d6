//! Business logic services
pub mod auth_service;
pub mod token_validator;

pub use auth_service::TokenIssuer;
pub use token_validator::{TokenValidator, BEARER_PREFIX};
