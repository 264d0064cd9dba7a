//! Service configuration read from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.

use crate::services::auth::TokenSettings;
use crate::services::price_feed::DEFAULT_UPSTREAM_URL;

/// Eight days, matching the lifetime of tokens issued by the login endpoint.
const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub price_upstream_url: String,
    pub first_superuser: Option<String>,
    pub first_superuser_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "Invalid value for {}: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to load .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so callers other than the
    /// process environment (tests, embedding) can supply values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => 8080,
        };

        let access_token_expire_minutes = match lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(value) => match value.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                        value,
                    });
                }
            },
            None => DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_expire_minutes,
            price_upstream_url: lookup("PRICE_UPSTREAM_URL")
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            first_superuser: lookup("FIRST_SUPERUSER"),
            first_superuser_password: lookup("FIRST_SUPERUSER_PASSWORD"),
        })
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            secret: self.jwt_secret.clone(),
            expire_minutes: self.access_token_expire_minutes,
        }
    }
}
