//! Service configuration, read from the process environment.
//!
//! `main` loads a `.env` file first, so every key below may also come from there.
// region:    --- Imports
use crate::bidding::rules::BidPolicy;
use crate::error::{AppError, Result};
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Config
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Takes precedence over the discrete `DB_*` settings when present.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub host: String,
    pub port: u16,
    /// Drop and recreate every table on start-up.
    pub reset_database: bool,
    pub enforce_end_time: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            host: get("DB_HOST", "localhost"),
            port: parse_var("DB_PORT", lookup("DB_PORT"), 5432)?,
            user: get("DB_USER", "postgres"),
            password: get("DB_PASSWORD", ""),
            name: get("DB_NAME", "encheres_royale"),
            max_connections: parse_var("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 10)?,
            acquire_timeout: Duration::from_secs(parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                lookup("DB_ACQUIRE_TIMEOUT_SECS"),
                2,
            )?),
            idle_timeout: Duration::from_secs(parse_var(
                "DB_IDLE_TIMEOUT_SECS",
                lookup("DB_IDLE_TIMEOUT_SECS"),
                30,
            )?),
        };

        Ok(Self {
            database,
            host: get("HOST", "0.0.0.0"),
            port: parse_var("PORT", lookup("PORT"), 3001)?,
            reset_database: parse_flag("RESET_DATABASE", lookup("RESET_DATABASE"))?,
            enforce_end_time: parse_flag("ENFORCE_END_TIME", lookup("ENFORCE_END_TIME"))?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bid_policy(&self) -> BidPolicy {
        BidPolicy {
            enforce_end_time: self.enforce_end_time,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| AppError::Config(format!("DATABASE_URL: {}", e)));
        }

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name))
    }
}
// endregion: --- Config

// region:    --- Parsing
fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(AppError::Config(format!("{} must be a boolean", key))),
        },
    }
}
// endregion: --- Parsing

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
        assert_eq!(config.database.name, "encheres_royale");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(2));
        assert!(config.database.url.is_none());
        assert!(!config.reset_database);
        assert!(!config.bid_policy().enforce_end_time);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://u:p@db:5433/auctions"),
            ("PORT", "8080"),
            ("ENFORCE_END_TIME", "true"),
            ("DB_MAX_CONNECTIONS", "20"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.enforce_end_time);
        assert_eq!(config.database.max_connections, 20);
        assert!(config.database.connect_options().is_ok());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("RESET_DATABASE", "maybe")]),
            Err(AppError::Config(_))
        ));
    }
}
