//! PMS API Gateway - Main entry point

use actix_middleware::RequestLogging;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use api_gateway::{
    config::Config, proxy, EdgeTrustMiddleware, RemoteTokenValidator, RouteTable, TokenValidator,
    UpstreamForwarder,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,api_gateway=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Starting PMS API Gateway");

    let routes = RouteTable::parse(&config.gateway_routes).context("Invalid GATEWAY_ROUTES")?;
    info!(routes = routes.len(), "Route table loaded");
    let forwarder = web::Data::new(
        UpstreamForwarder::new(routes, config.upstream_timeout())
            .context("Failed to build upstream client")?,
    );

    let validator: Arc<dyn TokenValidator> = Arc::new(RemoteTokenValidator::new(
        &config.auth_service_url,
        config.validator_timeout(),
        config.validator_max_attempts,
    )
    .with_retry_backoff(config.validator_retry_backoff()));
    info!(
        auth_service = %config.auth_service_url,
        timeout_ms = config.validator_timeout_ms,
        max_attempts = config.validator_max_attempts,
        retry_backoff_ms = config.validator_retry_backoff_ms,
        "Token validator configured"
    );

    let bind_addr = config.bind_addr();
    info!("API Gateway listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(EdgeTrustMiddleware::new(validator.clone()))
            .wrap(RequestLogging::new().skip_paths(["/health"]))
            .app_data(forwarder.clone())
            .route("/health", web::get().to(api_gateway::health))
            .default_service(web::to(proxy::forward))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("API Gateway stopped with an error")
}
