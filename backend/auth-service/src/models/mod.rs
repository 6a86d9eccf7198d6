/// Data models for authentication
pub mod user;

pub use user::{Credentials, LoginRequest, LoginResponse, LogoutResponse, StoredUser, ValidateResponse};
