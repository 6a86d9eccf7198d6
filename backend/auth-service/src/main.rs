//! PMS Auth Service - Main entry point
//!
//! REST API for login and token validation.

use actix_middleware::RequestLogging;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use crypto_core::TokenCodec;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use auth_service::{
    config::Config,
    db::{InMemoryUserStore, UserStore},
    security::{Argon2PasswordHasher, PasswordHasher},
    AppState, TokenIssuer, TokenValidator,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,auth_service=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Starting PMS Auth Service");

    let secret = config.signing_secret()?;
    let ttl = config.token_ttl()?;
    let codec = TokenCodec::new(&secret);

    let store = match config.seed_users.as_deref() {
        Some(seed) => InMemoryUserStore::from_seed(seed).context("Invalid SEED_USERS")?,
        None => InMemoryUserStore::new(),
    };
    if store.is_empty() {
        warn!("User store is empty; every login will fail until SEED_USERS is set");
    } else {
        info!(users = store.len(), "User store seeded");
    }

    let store: Arc<dyn UserStore> = Arc::new(store);
    let hasher: Arc<dyn PasswordHasher> =
        Arc::new(Argon2PasswordHasher::new().context("Failed to initialise password hasher")?);

    let state = web::Data::new(AppState {
        issuer: TokenIssuer::new(store, hasher, codec.clone(), ttl),
        validator: TokenValidator::new(codec),
    });

    let bind_addr = config.bind_addr();
    info!("Auth service listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogging::new().skip_paths(["/health"]))
            .app_data(state.clone())
            .configure(auth_service::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("Auth service stopped with an error")
}
