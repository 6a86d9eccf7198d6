//! Downstream trust filter
//!
//! Builds the request identity from the gateway-authored trust headers. The token is
//! never re-verified here: trust is inherited from the gateway.
//!
//! ## Deployment invariant
//!
//! A service wrapped in [`TrustedHeaderAuth`] must only be reachable through the API
//! gateway. Anything that can reach the service directly can set the trust headers
//! itself; network policy (private network, ingress rules, mTLS between hops) is what
//! enforces this, not the middleware.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use crypto_core::Identity;
use futures::future::{ready, Ready};
use serde_json::json;
use thiserror::Error;

use crate::trust_headers;

/// Identity bound to the current request by [`TrustedHeaderAuth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn subject(&self) -> &str {
        self.0.subject()
    }

    /// Route-level role check
    pub fn require_role(&self, role: &str) -> Result<&Identity, AuthzError> {
        if self.0.has_role(role) {
            Ok(&self.0)
        } else {
            tracing::warn!(subject = %self.0.subject(), required = %role, "Role check failed");
            Err(AuthzError::Forbidden(role.to_string()))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("missing required role {0}")]
    Forbidden(String),
}

impl ResponseError for AuthzError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthzError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            AuthzError::Unauthenticated => ("UNAUTHORIZED", "Authentication required"),
            AuthzError::Forbidden(_) => ("FORBIDDEN", "Insufficient permissions"),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "status": status,
            "message": message,
        }))
    }
}

/// Downstream trust filter middleware
///
/// Requests without a valid trust-header pair pass through unauthenticated; each
/// route decides via [`AuthenticatedUser`] whether that is a 401.
#[derive(Clone, Default)]
pub struct TrustedHeaderAuth;

impl<S, B> Transform<S, ServiceRequest> for TrustedHeaderAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TrustedHeaderAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TrustedHeaderAuthService { service }))
    }
}

pub struct TrustedHeaderAuthService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TrustedHeaderAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(identity) = trust_headers::read_identity(req.headers()) {
            tracing::debug!(subject = %identity.subject(), "Bound identity from trust headers");
            req.extensions_mut().insert(AuthenticatedUser(identity));
        }

        self.service.call(req)
    }
}

/// FromRequest implementation for AuthenticatedUser
impl FromRequest for AuthenticatedUser {
    type Error = AuthzError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AuthzError::Unauthenticated)),
        }
    }
}
