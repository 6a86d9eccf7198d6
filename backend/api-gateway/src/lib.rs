//! API Gateway
//!
//! Single entry point for clients. Every request passes the edge trust filter, which
//! strips client-supplied trust headers and, for protected paths, validates the
//! bearer token against the auth-service before forwarding upstream.

pub mod clients;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;

pub use clients::{RemoteTokenValidator, TokenValidator, ValidatorError, VerifiedIdentity};
pub use error::GatewayError;
pub use middleware::EdgeTrustMiddleware;
pub use proxy::{RouteTable, UpstreamForwarder};

pub async fn health() -> &'static str {
    "OK"
}
