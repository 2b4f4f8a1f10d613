use axum_helpers::JwtConfig;
use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_optional, env_parse_or, server::ServerConfig,
};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_messaging::MessagingSettings;
use std::fmt;

pub use core_config::Environment;

/// First admin account, created on startup when no user has this email
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BootstrapAdmin {
    /// `BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD`, both or neither
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            env_optional("BOOTSTRAP_ADMIN_EMAIL"),
            env_optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Ok(Some(Self { email, password })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "BOOTSTRAP_ADMIN_PASSWORD".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(
                "BOOTSTRAP_ADMIN_EMAIL".to_string(),
            )),
        }
    }
}

/// `MESSAGING_MAX_CONNECTIONS` (default 10000), `MESSAGING_MAX_MESSAGE_LENGTH` (default 4000)
fn messaging_settings() -> Result<MessagingSettings, ConfigError> {
    let defaults = MessagingSettings::default();
    let settings = MessagingSettings {
        max_connections: env_parse_or("MESSAGING_MAX_CONNECTIONS", defaults.max_connections)?,
        max_message_length: env_parse_or(
            "MESSAGING_MAX_MESSAGE_LENGTH",
            defaults.max_message_length,
        )?,
    };

    if settings.max_message_length == 0 {
        return Err(ConfigError::ParseError {
            key: "MESSAGING_MAX_MESSAGE_LENGTH".to_string(),
            details: "must be greater than zero".to_string(),
        });
    }
    Ok(settings)
}

/// Console configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub messaging: MessagingSettings,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?;
        let redis = RedisConfig::from_env()?;
        let server = ServerConfig::from_env()?;
        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            redis,
            server,
            environment,
            jwt,
            bootstrap_admin: BootstrapAdmin::from_env()?,
            messaging: messaging_settings()?,
        })
    }
}
