// User model
use crypto_core::{Identity, Roles};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use zeroize::Zeroizing;

/// A user record as held by the user store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub identifier: String,
    /// Argon2 PHC string
    pub hashed_secret: String,
    pub roles: Roles,
}

/// Login credentials; lives only for the authentication check
pub struct Credentials {
    pub identifier: String,
    pub secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email should be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank", message = "Password is required"))]
    pub password: String,
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Credentials::new(req.email, req.password)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Expiry instant, epoch milliseconds
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub message: String,
}

impl ValidateResponse {
    pub fn valid(identity: &Identity) -> Self {
        Self {
            valid: true,
            email: Some(identity.subject().to_string()),
            roles: identity.roles().iter().map(str::to_string).collect(),
            message: "Token is valid".to_string(),
        }
    }

    /// Same body for every failure reason
    pub fn invalid() -> Self {
        Self {
            valid: false,
            email: None,
            roles: Vec::new(),
            message: "Invalid token".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}
