// Auth Service Library
//
// Issues signed tokens for valid credentials and validates them for the gateway.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;

#[cfg(test)]
mod tests;

use actix_web::web;

pub use error::{AuthError, Result};
pub use services::{TokenIssuer, TokenValidator};

#[derive(Clone)]
pub struct AppState {
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
}

/// Register all auth-service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(handlers::json_config())
        .route("/login", web::post().to(handlers::login))
        .route("/validate", web::get().to(handlers::validate))
        .route("/logout", web::post().to(handlers::logout))
        .route("/health", web::get().to(handlers::health));
}
