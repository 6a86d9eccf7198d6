//! Error types for Patient Service
//!
//! Errors are converted to JSON HTTP responses for API clients.
use actix_middleware::AuthzError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PatientError>;

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("patient {0} not found")]
    NotFound(Uuid),

    #[error("a patient with email {0} already exists")]
    EmailExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Authz(#[from] AuthzError),
}

impl ResponseError for PatientError {
    fn status_code(&self) -> StatusCode {
        match self {
            PatientError::NotFound(_) => StatusCode::NOT_FOUND,
            PatientError::EmailExists(_) => StatusCode::CONFLICT,
            PatientError::Validation(_) => StatusCode::BAD_REQUEST,
            PatientError::Authz(e) => e.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = match self {
            PatientError::NotFound(_) => "NOT_FOUND",
            PatientError::EmailExists(_) => "CONFLICT",
            PatientError::Validation(_) => "VALIDATION_ERROR",
            PatientError::Authz(e) => return e.error_response(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "status": status,
            "message": self.to_string(),
        }))
    }
}
