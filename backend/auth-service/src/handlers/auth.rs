use actix_web::{error::JsonPayloadError, http::header, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::error::{AuthError, Result};
use crate::models::{LoginRequest, LoginResponse, LogoutResponse, ValidateResponse};
use crate::AppState;

/// Malformed login bodies get the same JSON error shape as validation failures
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req| {
        tracing::debug!(error = %err, "Rejected login payload");
        AuthError::Validation("Request body must be JSON with email and password".to_string())
            .into()
    })
}

/// Exchange credentials for a token
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    request.validate().map_err(|e| {
        let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        AuthError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    })?;

    let token = state.issuer.authenticate(request.into()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        expires_in: token.expires_at().timestamp_millis(),
        token: token.into_compact(),
    }))
}

/// Validate the bearer token in the `Authorization` header.
///
/// Every failure gets the same body; the reason only reaches the log.
pub async fn validate(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match state.validator.validate(bearer).into_identity() {
        Some(identity) => HttpResponse::Ok().json(ValidateResponse::valid(&identity)),
        None => HttpResponse::Unauthorized().json(ValidateResponse::invalid()),
    }
}

/// Tokens are stateless; logging out means the client discards its token
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(LogoutResponse {
        message: "Logged out; discard the token client-side".to_string(),
    })
}

pub async fn health() -> &'static str {
    "OK"
}
