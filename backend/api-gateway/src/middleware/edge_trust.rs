//! Edge trust filter
//!
//! Per request, strictly in this order:
//!
//! 1. strip every client-supplied header in the reserved trust namespace
//! 2. public paths stop here and are forwarded as-is
//! 3. read `Authorization`; missing or non-bearer is rejected without network I/O
//! 4. ask the validator (the only suspension point)
//! 5. on a verified identity inject the trust headers and forward, leaving
//!    `Authorization` untouched
//!
//! Any other outcome is a 401 with one fixed body and the request is never forwarded.

use actix_middleware::trust_headers;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::clients::TokenValidator;
use crate::error::GatewayError;

const BEARER_PREFIX: &str = "Bearer ";

/// Paths served without a token. They are still sanitised.
pub const DEFAULT_PUBLIC_PATHS: [&str; 3] = ["/health", "/api/auth/login", "/api/auth/validate"];

#[derive(Clone)]
pub struct EdgeTrustMiddleware {
    validator: Arc<dyn TokenValidator>,
    public_paths: Arc<Vec<String>>,
}

impl EdgeTrustMiddleware {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            public_paths: Arc::new(DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect()),
        }
    }

    /// Replace the public path list (exact matches)
    pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_paths = Arc::new(paths.into_iter().map(Into::into).collect());
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for EdgeTrustMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = EdgeTrustService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(EdgeTrustService {
            service: Rc::new(service),
            validator: self.validator.clone(),
            public_paths: self.public_paths.clone(),
        }))
    }
}

pub struct EdgeTrustService<S> {
    service: Rc<S>,
    validator: Arc<dyn TokenValidator>,
    public_paths: Arc<Vec<String>>,
}

impl<S> EdgeTrustService<S> {
    fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }
}

impl<S, B> Service<ServiceRequest> for EdgeTrustService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // Runs before anything else, on every path
        let stripped = trust_headers::strip_reserved(req.headers_mut());
        if stripped > 0 {
            warn!(stripped, path = %req.path(), "Dropped client-supplied trust headers");
        }

        if self.is_public(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let bearer = match bearer_value(&req) {
            Some(bearer) => bearer,
            None => {
                debug!(path = %req.path(), "Rejected request without bearer token");
                return Box::pin(ready(Ok(reject(req))));
            }
        };

        let service = self.service.clone();
        let validator = self.validator.clone();

        Box::pin(async move {
            let verified = match validator.validate(&bearer).await {
                Ok(verified) => verified,
                Err(e) => {
                    warn!(path = %req.path(), error = %e, "Rejected request: token not validated");
                    return Ok(reject(req));
                }
            };

            if let Err(e) = trust_headers::inject(req.headers_mut(), verified.identity()) {
                error!(error = %e, "Verified identity is not representable as headers");
                return Ok(reject(req));
            }
            debug!(subject = %verified.identity().subject(), path = %req.path(), "Request authorized");
            req.extensions_mut().insert(verified);

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

/// The full `Authorization` value, if it is exactly one non-empty bearer credential
fn bearer_value(req: &ServiceRequest) -> Option<String> {
    let mut values = req.headers().get_all(AUTHORIZATION);
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }

    let value = value.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?;
    if token.trim().is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn reject<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    req.into_response(GatewayError::Unauthorized.error_response())
        .map_into_right_body()
}
