//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `STORAGE_BACKEND` - `postgres` (default) or `memory`
//! - `DATABASE_URL` - Postgres connection string, required for `postgres`
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `PORT` - listen port (default: 8083)
//! - `TOKEN_SECRET` - token signing key, at least 32 bytes. Optional only
//!   for the `memory` backend, which then signs with a fixed development key
//! - `ACCESS_TOKEN_TTL_SECS` - access token lifetime (default: 86400)
//! - `REFRESH_TOKEN_TTL_SECS` - refresh token lifetime (default: 604800)
//! - `NATS_URL` - event broker, events are dropped when unset
//! - `NATS_SUBJECT_PREFIX` - subject prefix (default: shop)

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const DEV_TOKEN_SECRET: &str = "storefront-development-signing-key-do-not-deploy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                reason: format!("expected postgres or memory, got {other}"),
            }),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub port: u16,
    pub token_secret: String,
    /// Set when the development key stands in for `TOKEN_SECRET`.
    pub dev_token_secret: bool,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub nats_url: Option<String>,
    pub nats_prefix: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("max_connections", &self.max_connections)
            .field("port", &self.port)
            .field("token_secret", &"[redacted]")
            .field("dev_token_secret", &self.dev_token_secret)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("nats_url", &self.nats_url)
            .field("nats_prefix", &self.nats_prefix)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
    }
}

fn ttl(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default_secs: i64) -> Result<Duration, ConfigError> {
    let secs: i64 = parse_or(lookup, name, default_secs)?;
    if secs <= 0 {
        return Err(ConfigError::Invalid { name, reason: "must be positive".into() });
    }
    Ok(Duration::seconds(secs))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL");
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let (token_secret, dev_token_secret) = match (lookup("TOKEN_SECRET"), backend) {
            (Some(secret), _) => (secret, false),
            (None, StorageBackend::Memory) => (DEV_TOKEN_SECRET.to_string(), true),
            (None, StorageBackend::Postgres) => return Err(ConfigError::Missing("TOKEN_SECRET")),
        };
        if token_secret.len() < MIN_TOKEN_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                name: "TOKEN_SECRET",
                reason: format!("must be at least {MIN_TOKEN_SECRET_LENGTH} bytes"),
            });
        }

        let max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid { name: "DATABASE_MAX_CONNECTIONS", reason: "must be positive".into() });
        }

        Ok(Self {
            backend,
            database_url,
            max_connections,
            port: parse_or(&lookup, "PORT", 8083)?,
            token_secret,
            dev_token_secret,
            access_ttl: ttl(&lookup, "ACCESS_TOKEN_TTL_SECS", 86_400)?,
            refresh_ttl: ttl(&lookup, "REFRESH_TOKEN_TTL_SECS", 604_800)?,
            nats_url: lookup("NATS_URL"),
            nats_prefix: lookup("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "shop".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("TOKEN_SECRET", "0123456789abcdef0123456789abcdef"),
        ])
        .unwrap();
        assert_eq!(config.backend, StorageBackend::Postgres);
        assert_eq!(config.port, 8083);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.access_ttl, Duration::hours(24));
        assert_eq!(config.refresh_ttl, Duration::days(7));
        assert_eq!(config.nats_prefix, "shop");
        assert!(!format!("{config:?}").contains("0123456789abcdef"));
    }

    #[test]
    fn test_postgres_requires_url_and_secret() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://localhost/shop")]),
            Err(ConfigError::Missing("TOKEN_SECRET"))
        ));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("TOKEN_SECRET", "short")]),
            Err(ConfigError::Invalid { name: "TOKEN_SECRET", .. })
        ));
    }

    #[test]
    fn test_memory_backend() {
        let config = load(&[("STORAGE_BACKEND", "memory"), ("PORT", "9000")]).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert!(config.dev_token_secret);
        assert_eq!(config.port, 9000);

        assert!(load(&[("STORAGE_BACKEND", "sqlite")]).is_err());
        assert!(load(&[("STORAGE_BACKEND", "memory"), ("PORT", "http")]).is_err());
    }
}
