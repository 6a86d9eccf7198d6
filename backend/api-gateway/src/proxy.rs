//! Upstream forwarding
//!
//! Maps a path prefix to an upstream base URL, strips the prefix and replays the
//! request (already sanitised by the edge trust filter) with `reqwest`.

use actix_web::{
    http::{header::HeaderMap, StatusCode},
    web, HttpRequest, HttpResponse,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// Connection-scoped headers that must not be replayed across a hop
const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    prefix: String,
    upstream: String,
}

/// Prefix -> upstream table, longest prefix first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Parse `prefix=url,prefix=url`
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let mut routes = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (prefix, upstream) = entry
                .split_once('=')
                .ok_or_else(|| GatewayError::InvalidRoutes(format!("missing '=' in {entry:?}")))?;
            let prefix = prefix.trim().trim_end_matches('/');
            let upstream = upstream.trim().trim_end_matches('/');

            if !prefix.starts_with('/') {
                return Err(GatewayError::InvalidRoutes(format!(
                    "prefix must start with '/': {prefix:?}"
                )));
            }
            if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
                return Err(GatewayError::InvalidRoutes(format!(
                    "upstream must be an http(s) URL: {upstream:?}"
                )));
            }
            routes.push(Route {
                prefix: prefix.to_string(),
                upstream: upstream.to_string(),
            });
        }

        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Upstream URL for `path`, prefix removed. Prefixes match whole segments only.
    pub fn resolve(&self, path: &str) -> Option<String> {
        self.routes.iter().find_map(|route| {
            let rest = path.strip_prefix(route.prefix.as_str())?;
            if rest.is_empty() || rest.starts_with('/') {
                Some(format!("{}{}", route.upstream, rest))
            } else {
                None
            }
        })
    }
}

pub struct UpstreamForwarder {
    client: reqwest::Client,
    routes: RouteTable,
}

impl UpstreamForwarder {
    pub fn new(routes: RouteTable, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(Self { client, routes })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn forward(&self, req: &HttpRequest, body: web::Bytes) -> Result<HttpResponse, GatewayError> {
        let mut url = self
            .routes
            .resolve(req.path())
            .ok_or_else(|| GatewayError::RouteNotFound(req.path().to_string()))?;
        if !req.query_string().is_empty() {
            url.push('?');
            url.push_str(req.query_string());
        }

        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        debug!(method = %method, path = %req.path(), upstream = %url, "Forwarding request");

        let response = self
            .client
            .request(method, &url)
            .headers(outbound_headers(req.headers()))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(upstream = %url, error = %e, "Upstream request failed");
                GatewayError::Upstream(e.to_string())
            })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        let mut builder = HttpResponse::build(status);
        for (name, value) in response.headers() {
            if !is_hop_by_hop(name.as_str()) {
                builder.append_header((name.as_str(), value.as_bytes()));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(builder.body(body))
    }
}

/// Default service: forward whatever the edge trust filter let through
pub async fn forward(
    req: HttpRequest,
    body: web::Bytes,
    forwarder: web::Data<UpstreamForwarder>,
) -> Result<HttpResponse, GatewayError> {
    forwarder.forward(&req, body).await
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

fn outbound_headers(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut outbound = reqwest::header::HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes());
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            outbound.append(name, value);
        }
    }
    outbound
}
