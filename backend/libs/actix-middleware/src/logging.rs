//! Request logging
//!
//! One tracing event per request with method, path, status, latency and whether an
//! identity was bound. Header values are never logged; they may carry tokens.
//!
//! An identity counts as bound when the downstream filter attached an
//! [`AuthenticatedUser`] or when the gateway injected a well-formed trust-header pair.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

use crate::header_auth::AuthenticatedUser;
use crate::trust_headers;

const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RequestLogging {
    slow_threshold: Duration,
    skip_paths: Arc<Vec<String>>,
}

impl Default for RequestLogging {
    fn default() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            skip_paths: Arc::new(Vec::new()),
        }
    }
}

impl RequestLogging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests slower than this are logged at warn
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Exact paths that are not logged on success (health probes)
    pub fn skip_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.skip_paths = Arc::new(paths.into_iter().map(Into::into).collect());
        self
    }
}

/// Level for a finished request; `None` means stay quiet
fn level_for(status: StatusCode, elapsed: Duration, slow: Duration, skipped: bool) -> Option<Level> {
    if status.is_server_error() {
        Some(Level::ERROR)
    } else if elapsed >= slow {
        Some(Level::WARN)
    } else if skipped {
        None
    } else if status.is_client_error() {
        Some(Level::DEBUG)
    } else {
        Some(Level::INFO)
    }
}

fn identity_bound<B>(res: &ServiceResponse<B>) -> bool {
    let req = res.request();
    req.extensions().contains::<AuthenticatedUser>()
        || trust_headers::read_identity(req.headers()).is_some()
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingService {
            service: Rc::new(service),
            config: self.clone(),
        }))
    }
}

pub struct RequestLoggingService<S> {
    service: Rc<S>,
    config: RequestLogging,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let skipped = self.config.skip_paths.iter().any(|p| *p == path);
        let slow = self.config.slow_threshold;

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = match fut.await {
                Ok(res) => res,
                Err(e) => {
                    tracing::error!(method = %method, path = %path, error = %e, "HTTP request errored");
                    return Err(e);
                }
            };

            let elapsed = started.elapsed();
            let status = res.status().as_u16();
            let duration_ms = elapsed.as_millis() as u64;
            let authenticated = identity_bound(&res);

            macro_rules! emit {
                ($level:ident, $msg:literal) => {
                    tracing::$level!(
                        method = %method,
                        path = %path,
                        status,
                        duration_ms,
                        authenticated,
                        $msg
                    )
                };
            }

            match level_for(res.status(), elapsed, slow, skipped) {
                Some(level) if level == Level::ERROR => emit!(error, "HTTP request failed"),
                Some(level) if level == Level::WARN => emit!(warn, "Slow HTTP request"),
                Some(level) if level == Level::DEBUG => emit!(debug, "HTTP request rejected"),
                Some(_) => emit!(info, "HTTP request completed"),
                None => {}
            }

            Ok(res)
        })
    }
}
