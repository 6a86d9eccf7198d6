//! PMS Patient Service - Main entry point

use actix_middleware::{RequestLogging, TrustedHeaderAuth};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::prelude::*;

use patient_service::{config::Config, PatientStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,patient_service=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Starting PMS Patient Service");

    let store = web::Data::new(PatientStore::new());
    let bind_addr = config.bind_addr();
    info!("Patient service listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TrustedHeaderAuth)
            .wrap(RequestLogging::new().skip_paths(["/health"]))
            .app_data(store.clone())
            .configure(patient_service::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("Patient service stopped with an error")
}
