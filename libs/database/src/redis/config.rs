#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_optional, env_required};

/// Redis connection settings
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// `redis://[user:pass@]host:port[/db]`
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// `REDIS_URL` (required; `REDIS_HOST` accepted as a fallback name)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = match env_optional("REDIS_URL") {
            Some(url) => url,
            None => env_required("REDIS_HOST")
                .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?,
        };

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(ConfigError::ParseError {
                key: "REDIS_URL".to_string(),
                details: "must start with redis:// or rediss://".to_string(),
            });
        }

        Ok(Self { url })
    }
}
