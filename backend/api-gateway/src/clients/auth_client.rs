//! Token validation against the auth-service
//!
//! The only network hop the edge trust filter makes per request. Every outcome
//! other than a well-formed `valid: true` answer is an error, and the filter treats
//! every error as unauthorized.

use async_trait::async_trait;
use crypto_core::{Identity, Roles};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Pause before re-asking a validator that just failed
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Identity asserted by the auth-service for one bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity(Identity);

impl VerifiedIdentity {
    pub fn new(identity: Identity) -> Self {
        Self(identity)
    }

    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn into_identity(self) -> Identity {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// The validator answered and said no
    #[error("token rejected by validator")]
    Rejected,

    #[error("validator transport error: {0}")]
    Transport(String),

    #[error("validator call timed out")]
    Timeout,

    #[error("invalid validator response: {0}")]
    InvalidResponse(String),
}

impl ValidatorError {
    /// Only transient failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ValidatorError::Transport(_) | ValidatorError::Timeout)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a full `Authorization` header value (`Bearer <token>`)
    async fn validate(&self, bearer: &str) -> Result<VerifiedIdentity, ValidatorError>;
}

/// Wire body of `GET /validate`
#[derive(Debug, Deserialize)]
struct ValidateBody {
    valid: bool,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// `TokenValidator` backed by the auth-service `/validate` endpoint
#[derive(Debug, Clone)]
pub struct RemoteTokenValidator {
    client: Client,
    validate_url: String,
    attempt_timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl RemoteTokenValidator {
    /// `max_attempts` counts the first try and is clamped to at least one
    pub fn new(auth_service_url: &str, attempt_timeout: Duration, max_attempts: u32) -> Self {
        Self::with_client(Client::new(), auth_service_url, attempt_timeout, max_attempts)
    }

    pub fn with_client(
        client: Client,
        auth_service_url: &str,
        attempt_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            client,
            validate_url: format!("{}/validate", auth_service_url.trim_end_matches('/')),
            attempt_timeout,
            max_attempts: max_attempts.max(1),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Fixed delay between attempts
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    async fn attempt(&self, bearer: &str) -> Result<VerifiedIdentity, ValidatorError> {
        let call = async {
            let response = self
                .client
                .get(&self.validate_url)
                .header(AUTHORIZATION, bearer)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = timeout(self.attempt_timeout, call)
            .await
            .map_err(|_| ValidatorError::Timeout)?
            .map_err(|e| ValidatorError::Transport(e.to_string()))?;

        interpret(status, &body)
    }
}

#[async_trait]
impl TokenValidator for RemoteTokenValidator {
    async fn validate(&self, bearer: &str) -> Result<VerifiedIdentity, ValidatorError> {
        let mut attempt = 1;
        loop {
            match self.attempt(bearer).await {
                Ok(verified) => return Ok(verified),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = self.retry_backoff.as_millis() as u64,
                        error = %e,
                        "Validator call failed, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Validator call finished without a valid identity");
                    return Err(e);
                }
            }
        }
    }
}

/// Map a `/validate` answer to an identity, failing closed on anything unexpected
fn interpret(status: StatusCode, body: &[u8]) -> Result<VerifiedIdentity, ValidatorError> {
    match status {
        StatusCode::OK => {}
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ValidatorError::Rejected),
        other => {
            return Err(ValidatorError::InvalidResponse(format!(
                "unexpected status {other}"
            )))
        }
    }

    let body: ValidateBody = serde_json::from_slice(body)
        .map_err(|e| ValidatorError::InvalidResponse(format!("unreadable body: {e}")))?;
    if !body.valid {
        return Err(ValidatorError::Rejected);
    }

    let email = body
        .email
        .ok_or_else(|| ValidatorError::InvalidResponse("missing email".to_string()))?;
    let roles = Roles::try_from_iter(&body.roles)
        .map_err(|e| ValidatorError::InvalidResponse(e.to_string()))?;
    let identity =
        Identity::new(email, roles).map_err(|e| ValidatorError::InvalidResponse(e.to_string()))?;

    Ok(VerifiedIdentity::new(identity))
}
