//! HTTP request handlers (REST API)
pub mod auth;

pub use auth::{health, json_config, login, logout, validate};
