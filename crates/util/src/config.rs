use std::{env, str::FromStr};

use thiserror::Error;

use crate::resolve_database_url;

/// Deployment flavour read from `APP_ENV`. Only the log format depends on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// Production emits JSON lines; the other environments log for humans.
    pub fn structured_logs(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    /// Case-insensitive; a blank value selects development.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::InvalidEnvironment(value.to_string())),
        }
    }
}

/// Settings the binary needs before touching the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves `APP_ENV` and `DATABASE_URL` through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = lookup("APP_ENV")
            .as_deref()
            .unwrap_or_default()
            .parse()?;
        let database_url = resolve_database_url(lookup("DATABASE_URL").as_deref())?;

        Ok(Self {
            database_url,
            environment,
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_ENV must be development, production or test (got {0:?})")]
    InvalidEnvironment(String),
    #[error("DATABASE_URL must be a sqlite: connection string (got {0})")]
    DatabaseUrl(String),
}
