use crate::{ConfigError, FromEnv, env_or_default, env_parse_or};
use std::net::Ipv4Addr;
use std::time::Duration;

/// HTTP listener settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single REST request (WebSocket upgrades are exempt)
    pub request_timeout: Duration,
    /// Time granted to cleanup tasks after a shutdown signal
    pub shutdown_timeout: Duration,
    /// Maximum accepted request body, CSV imports included
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// "host:port" for `TcpListener::bind`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// - `HOST` (default 0.0.0.0)
    /// - `PORT` (default 8080)
    /// - `REQUEST_TIMEOUT_SECS` (default 30)
    /// - `SHUTDOWN_TIMEOUT_SECS` (default 30)
    /// - `MAX_BODY_BYTES` (default 10 MiB)
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse_or("PORT", 8080u16)?;
        let request_timeout = Duration::from_secs(env_parse_or("REQUEST_TIMEOUT_SECS", 30u64)?);
        let shutdown_timeout = Duration::from_secs(env_parse_or("SHUTDOWN_TIMEOUT_SECS", 30u64)?);
        let max_body_bytes = env_parse_or("MAX_BODY_BYTES", 10 * 1024 * 1024usize)?;

        Ok(Self {
            host,
            port,
            request_timeout,
            shutdown_timeout,
            max_body_bytes,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}
