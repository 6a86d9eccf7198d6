//! Security module for authentication
//! Provides password hashing and verification

pub mod password;

pub use password::{Argon2PasswordHasher, PasswordHasher};
