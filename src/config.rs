//! Process configuration, collected from the environment at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub images: ImageHostConfig,
    pub nats_url: Option<String>,
}

/// Hosted auth service the admin bearer tokens are verified against.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Image-hosting collaborator account.
#[derive(Clone, Debug)]
pub struct ImageHostConfig {
    pub api_base: String,
    pub account_id: String,
    pub api_token: String,
    /// Base of the delivery URLs, used when the upload response carries no
    /// variant URL.
    pub delivery_url: String,
}

const DEFAULT_IMAGES_API_BASE: &str = "https://api.cloudflare.com/client/v4";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 8080,
        };
        Ok(Self {
            port,
            database_url: require("DATABASE_URL")?,
            auth: AuthConfig {
                base_url: require("AUTH_BASE_URL")?,
                api_key: require("AUTH_API_KEY")?,
            },
            images: ImageHostConfig {
                api_base: std::env::var("IMAGES_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_IMAGES_API_BASE.to_owned()),
                account_id: require("IMAGES_ACCOUNT_ID")?,
                api_token: require("IMAGES_API_TOKEN")?,
                delivery_url: require("IMAGE_DELIVERY_URL")?,
            },
            nats_url: std::env::var("NATS_URL").ok(),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}
