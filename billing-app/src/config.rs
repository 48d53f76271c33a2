//! Configuration loading from environment.

use std::env;
use std::str::FromStr;

use billing_hex::inbound::HttpConfig;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub http: HttpConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = HttpConfig::default();

        let port = parse_or(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let http = HttpConfig {
            api_host: lookup("API_HOST").unwrap_or(defaults.api_host),
            limit_default: parse_or(&lookup, "LIMIT_DEFAULT", defaults.limit_default)?,
            limit_max: parse_or(&lookup, "LIMIT_MAX", defaults.limit_max)?,
        };

        if http.limit_default == 0 || http.limit_default > http.limit_max {
            anyhow::bail!(
                "LIMIT_DEFAULT must be between 1 and LIMIT_MAX ({}), got {}",
                http.limit_max,
                http.limit_default
            );
        }

        Ok(Self {
            port,
            database_url,
            http,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {} {:?}: {}", key, raw, e)),
    }
}
