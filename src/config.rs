//! Application configuration loaded from environment variables.

use std::env;

use crate::error::Result;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Logical service name attached to closing span tags (optional)
    pub service_name: Option<String>,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// Request paths that bypass tracing entirely (health checks etc.)
    pub skip_paths: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service_name: env::var("SERVICE_NAME").ok().filter(|s| !s.is_empty()),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            skip_paths: env::var("SKIP_PATHS")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| vec!["/healthz".into()]),
        })
    }
}
