//! Configuration management

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        #[cfg(debug_assertions)]
        let _ = dotenvy::dotenv();

        envy::from_env().context("Failed to load patient-service configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
