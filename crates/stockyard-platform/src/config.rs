use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub http_addr: String,
    /// Per-movement deadline; unset means no deadline.
    pub movement_timeout: Option<Duration>,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());
        let movement_timeout = match std::env::var("MOVEMENT_TIMEOUT_MS") {
            Ok(raw) => {
                let millis: u64 = raw
                    .parse()
                    .context("MOVEMENT_TIMEOUT_MS must be a number of milliseconds")?;
                Some(Duration::from_millis(millis))
            }
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
            movement_timeout,
        })
    }
}
