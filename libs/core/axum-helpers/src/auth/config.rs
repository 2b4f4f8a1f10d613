use core_config::{ConfigError, FromEnv, env_parse_or, env_required};

use super::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};

/// JWT signing settings.
///
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `JWT_ACCESS_TTL_SECS` (default 900)
/// - `JWT_REFRESH_TTL_SECS` (default 604800)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl JwtConfig {
    pub const MIN_SECRET_LEN: usize = 32;

    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least {} characters (got {}); generate one with: openssl rand -base64 32",
                    Self::MIN_SECRET_LEN,
                    secret.len()
                ),
            });
        }

        Ok(Self {
            secret,
            access_ttl_secs: ACCESS_TOKEN_TTL,
            refresh_ttl_secs: REFRESH_TOKEN_TTL,
        })
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(env_required("JWT_SECRET")?)?;
        config.access_ttl_secs = env_parse_or("JWT_ACCESS_TTL_SECS", ACCESS_TOKEN_TTL)?;
        config.refresh_ttl_secs = env_parse_or("JWT_REFRESH_TTL_SECS", REFRESH_TOKEN_TTL)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "this-is-a-valid-secret-with-32-chars!";

    #[test]
    fn test_new_rejects_short_secret() {
        let err = JwtConfig::new("short").unwrap_err();
        assert!(err.to_string().contains("32 characters"));
    }

    #[test]
    fn test_from_env_defaults_ttls() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("JWT_ACCESS_TTL_SECS", None),
                ("JWT_REFRESH_TTL_SECS", None),
            ],
            || {
                let config = JwtConfig::from_env().unwrap();
                assert_eq!(config.access_ttl_secs, 900);
                assert_eq!(config.refresh_ttl_secs, 604_800);
            },
        );
    }

    #[test]
    fn test_from_env_missing_secret() {
        temp_env::with_var_unset("JWT_SECRET", || {
            let err = JwtConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("JWT_SECRET"));
        });
    }
}
