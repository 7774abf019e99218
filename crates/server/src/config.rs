//! Process configuration read from the environment (and `.env` when present).

use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://nesti.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CHAT_RATE_LIMIT: usize = 20;
const DEFAULT_MEDIA_ROOT: &str = "media";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub chat_log_enabled: bool,
    pub chat_rate_limit: usize, // Messages per minute per session
    pub media_root: PathBuf,
    pub media_public_url: String,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse(&var, "PORT", DEFAULT_PORT)?;
        let chat_rate_limit = parse(&var, "CHAT_RATE_LIMIT", DEFAULT_CHAT_RATE_LIMIT)?;
        if chat_rate_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "CHAT_RATE_LIMIT",
                value: "0".to_string(),
            });
        }
        let chat_log_enabled = match var("CHAT_LOG_ENABLED") {
            None => true,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                name: "CHAT_LOG_ENABLED",
                value: v,
            })?,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            media_public_url: var("MEDIA_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://{host}:{port}/media")),
            host,
            port,
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            anthropic_model: var("ANTHROPIC_MODEL"),
            chat_log_enabled,
            chat_rate_limit,
            media_root: var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            sentry_dsn: var("SENTRY_DSN"),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                value: self.host.clone(),
            })
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
