use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every authentication failure, whatever the cause
    #[error("unauthorized")]
    Unauthorized,

    #[error("no route for path {0}")]
    RouteNotFound(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("invalid route table: {0}")]
    InvalidRoutes(String),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRoutes(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            GatewayError::Unauthorized => ("UNAUTHORIZED", "Unauthorized"),
            GatewayError::RouteNotFound(_) => ("NOT_FOUND", "Not found"),
            GatewayError::Upstream(_) => ("BAD_GATEWAY", "Upstream service unavailable"),
            GatewayError::InvalidRoutes(_) => ("INTERNAL_ERROR", "Internal server error"),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "status": status,
            "message": message,
        }))
    }
}
