//! Configuration for API Gateway
//!
//! Loads settings from environment variables, with a `.env` file honoured in
//! debug builds.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4004
}

fn default_auth_service_url() -> String {
    "http://auth-service:4005".to_string()
}

fn default_validator_timeout_ms() -> u64 {
    2_000
}

fn default_validator_max_attempts() -> u32 {
    2
}

fn default_validator_retry_backoff_ms() -> u64 {
    50
}

fn default_upstream_timeout_ms() -> u64 {
    30_000
}

fn default_gateway_routes() -> String {
    "/api/auth=http://auth-service:4005,/api/patients=http://patient-service:4000/patients"
        .to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Base URL of the auth-service; `/validate` is appended
    #[serde(default = "default_auth_service_url")]
    pub auth_service_url: String,
    /// Per-attempt budget for one validator call
    #[serde(default = "default_validator_timeout_ms")]
    pub validator_timeout_ms: u64,
    /// Total validator attempts per request (first try included)
    #[serde(default = "default_validator_max_attempts")]
    pub validator_max_attempts: u32,
    /// Pause between validator attempts
    #[serde(default = "default_validator_retry_backoff_ms")]
    pub validator_retry_backoff_ms: u64,

    /// `prefix=url,prefix=url`
    #[serde(default = "default_gateway_routes")]
    pub gateway_routes: String,
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        #[cfg(debug_assertions)]
        let _ = dotenvy::dotenv();

        let config: Config =
            envy::from_env().context("Failed to load api-gateway configuration")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.validator_max_attempts < 1 {
            anyhow::bail!("VALIDATOR_MAX_ATTEMPTS must be at least 1");
        }
        if self.validator_timeout_ms == 0 {
            anyhow::bail!("VALIDATOR_TIMEOUT_MS must be positive");
        }
        Ok(())
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_millis(self.validator_timeout_ms)
    }

    pub fn validator_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.validator_retry_backoff_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
