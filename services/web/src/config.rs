//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the session cookie and its backing record.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl: Duration,
    pub touch_after: Duration,
    pub sweep_interval: std::time::Duration,
    pub cookie_secure: bool,
}

impl SessionConfig {
    /// Settings suitable for tests and local tooling.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(7),
            touch_after: Duration::hours(24),
            sweep_interval: std::time::Duration::from_secs(3600),
            cookie_secure: false,
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub public_dir: PathBuf,
    pub session: SessionConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file is read in development, but this is skipped in production
    /// and in test builds so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = std::env::var("APP_ENV").is_ok_and(|v| v == "production");
        if !production && !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(addr) => addr.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => {
                let port: u16 = parse_or(&lookup, "PORT", 8080)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let database_url = required(&lookup, "DATABASE_URL")?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let public_dir = lookup("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./public"));

        // --- Session Settings ---
        let secret = required(&lookup, "SESSION_SECRET")?;
        let ttl_hours: i64 = parse_or(&lookup, "SESSION_TTL_HOURS", 7 * 24)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let touch_after_secs: i64 = parse_or(&lookup, "SESSION_TOUCH_AFTER_SECS", 24 * 3600)?;
        // Touching at or past the TTL would let an active session expire.
        if touch_after_secs < 0 || touch_after_secs >= ttl_hours.saturating_mul(3600) {
            return Err(ConfigError::InvalidValue(
                "SESSION_TOUCH_AFTER_SECS".to_string(),
                "must be between 0 and the session TTL".to_string(),
            ));
        }
        let sweep_secs: u64 = parse_or(&lookup, "SESSION_SWEEP_SECS", 3600)?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_SWEEP_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let cookie_secure: bool = parse_or(&lookup, "COOKIE_SECURE", false)?;

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            public_dir,
            session: SessionConfig {
                secret,
                ttl: Duration::hours(ttl_hours),
                touch_after: Duration::seconds(touch_after_secs),
                sweep_interval: std::time::Duration::from_secs(sweep_secs),
                cookie_secure,
            },
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://localhost/listings"),
            ("SESSION_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.session.ttl, Duration::days(7));
        assert_eq!(config.session.touch_after, Duration::hours(24));
        assert!(!config.session.cookie_secure);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn port_is_used_when_bind_address_is_absent() {
        let config = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db"),
            ("SESSION_SECRET", "x"),
            ("PORT", "3001"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address.port(), 3001);
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = Config::from_lookup(env(&[("DATABASE_URL", "postgres://db")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref k) if k == "SESSION_SECRET"));
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let err = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db"),
            ("SESSION_SECRET", "x"),
            ("SESSION_TTL_HOURS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "SESSION_TTL_HOURS"));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db"),
            ("SESSION_SECRET", "x"),
            ("SESSION_SWEEP_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "SESSION_SWEEP_SECS"));
    }

    #[test]
    fn touch_interval_must_fall_inside_the_ttl() {
        for touch in ["-1", "3600", "7200"] {
            let err = Config::from_lookup(env(&[
                ("DATABASE_URL", "postgres://db"),
                ("SESSION_SECRET", "x"),
                ("SESSION_TTL_HOURS", "1"),
                ("SESSION_TOUCH_AFTER_SECS", touch),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue(ref k, _) if k == "SESSION_TOUCH_AFTER_SECS"),
                "touch interval {} was accepted",
                touch
            );
        }

        let config = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db"),
            ("SESSION_SECRET", "x"),
            ("SESSION_TTL_HOURS", "1"),
            ("SESSION_TOUCH_AFTER_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.session.touch_after, Duration::zero());
    }
}
