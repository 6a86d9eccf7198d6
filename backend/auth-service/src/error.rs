use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::Utc;
use crypto_core::CodecError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier and wrong secret are deliberately the same variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User store error: {0}")]
    Store(String),

    #[error("Invalid seed user entry: {0}")]
    InvalidSeed(String),

    #[error("Token error: {0}")]
    Token(#[from] CodecError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Store(_)
            | AuthError::InvalidSeed(_)
            | AuthError::Token(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            AuthError::InvalidCredentials => ("BAD_CREDENTIALS", "Invalid email or password".to_string()),
            AuthError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            // Internal details go to the log, not the client
            _ => {
                tracing::error!(error = %self, "Request failed");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "status": status,
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
