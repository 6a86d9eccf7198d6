//! Token issuance
//!
//! Authenticates credentials against the user store and signs a token carrying the
//! user's identifier and roles. Failures are a single opaque `InvalidCredentials`:
//! callers can never tell an unknown identifier from a wrong password.

use chrono::{DateTime, Duration, Utc};
use crypto_core::{Identity, Token, TokenCodec};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::UserStore;
use crate::error::{AuthError, Result};
use crate::models::Credentials;
use crate::security::PasswordHasher;

#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: TokenCodec,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        codec: TokenCodec,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn authenticate(&self, credentials: Credentials) -> Result<Token> {
        self.authenticate_at(credentials, Utc::now()).await
    }

    /// Authenticate and issue a token as of `now`
    pub async fn authenticate_at(
        &self,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Result<Token> {
        let identifier = credentials.identifier.trim();
        if identifier.is_empty() || credentials.secret.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = match self.store.find_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy(&credentials.secret);
                warn!(identifier = %identifier, "Login failed: unknown identifier");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&credentials.secret, &user.hashed_secret) {
            warn!(identifier = %identifier, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::new(user.identifier, user.roles)
            .map_err(|e| AuthError::Store(format!("stored user is invalid: {e}")))?;
        let token = self.codec.sign(&identity, now, self.ttl)?;

        info!(
            subject = %identity.subject(),
            expires_at = %token.expires_at(),
            "Token issued"
        );
        Ok(token)
    }
}
