//! Configuration management
//!
//! Read from the environment with `envy`; in debug builds a local `.env` file is
//! loaded first.
use anyhow::{Context, Result};
use chrono::Duration;
use crypto_core::SigningSecret;
use serde::Deserialize;

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4005
}

fn default_jwt_expiration_ms() -> i64 {
    3_600_000
}

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Base64-encoded HS256 secret shared with nobody but this service
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_ms")]
    pub jwt_expiration_ms: i64,
    /// `email:phc-hash:ROLE1|ROLE2;...`
    #[serde(default)]
    pub seed_users: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        #[cfg(debug_assertions)]
        let _ = dotenvy::dotenv();

        envy::from_env::<Config>().context("Failed to load auth-service configuration")
    }

    pub fn signing_secret(&self) -> Result<SigningSecret> {
        SigningSecret::from_base64(&self.jwt_secret).context("Invalid JWT_SECRET")
    }

    /// Token lifetime; must be at least one second
    pub fn token_ttl(&self) -> Result<Duration> {
        if self.jwt_expiration_ms < 1_000 {
            anyhow::bail!(
                "JWT_EXPIRATION_MS must be at least 1000, got {}",
                self.jwt_expiration_ms
            );
        }
        Ok(Duration::milliseconds(self.jwt_expiration_ms))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("jwt_expiration_ms", &self.jwt_expiration_ms)
            .field("seed_users", &self.seed_users.as_ref().map(|_| "<set>"))
            .finish_non_exhaustive()
    }
}
