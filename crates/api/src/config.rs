//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `BILLFORGE_ENV` - `development` (default) or `production`
//! - `BILLFORGE_HOST` - Bind address (default: 0.0.0.0)
//! - `BILLFORGE_PORT` - Listen port (default: 8080)
//! - `JWT_SECRET` - Token signing secret; required in production
//! - `JWT_TTL_HOURS` - Token lifetime, 1 to 8784 (default: 168)
//! - `DATABASE_URL` - Postgres connection string; in-memory storage when unset
//! - `COOKIE_SECURE` - Mark the session cookie `Secure` (default: false)
//! - `LOG_FORMAT` - `json` (default) or `pretty`
//! - `CORS_ALLOW_ORIGIN` - Browser origin allowed to call the API

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;

use billforge_observability::LogFormat;

const DEV_JWT_SECRET: &str = "billforge-dev-secret-do-not-use-in-production";
const DEFAULT_JWT_TTL_HOURS: i64 = 168;
/// One leap year.
const MAX_JWT_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: SecretString,
    /// Set when `JWT_SECRET` was missing and the development secret is in use.
    pub jwt_secret_is_default: bool,
    pub jwt_ttl: chrono::Duration,
    pub database_url: Option<SecretString>,
    pub cookie_secure: bool,
    pub log_format: LogFormat,
    pub cors_allow_origin: Option<HeaderValue>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = match get("BILLFORGE_ENV").as_deref() {
            None | Some("development") | Some("dev") => false,
            Some("production") | Some("prod") => true,
            Some(other) => return Err(invalid("BILLFORGE_ENV", format!("unknown environment '{other}'"))),
        };

        let host = parse_or("BILLFORGE_HOST", get("BILLFORGE_HOST"), IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or("BILLFORGE_PORT", get("BILLFORGE_PORT"), 8080u16)?;

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (SecretString::from(secret), false),
            None if production => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
            None => (SecretString::from(DEV_JWT_SECRET), true),
        };

        let ttl_hours = parse_or("JWT_TTL_HOURS", get("JWT_TTL_HOURS"), DEFAULT_JWT_TTL_HOURS)?;
        if !(1..=MAX_JWT_TTL_HOURS).contains(&ttl_hours) {
            return Err(invalid("JWT_TTL_HOURS", format!("must be between 1 and {MAX_JWT_TTL_HOURS}")));
        }
        let jwt_ttl = chrono::Duration::try_hours(ttl_hours)
            .ok_or_else(|| invalid("JWT_TTL_HOURS", "out of range"))?;

        let cookie_secure = match get("COOKIE_SECURE") {
            None => false,
            Some(v) => parse_bool(&v).ok_or_else(|| invalid("COOKIE_SECURE", format!("expected true or false, got '{v}'")))?,
        };

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(v) => v.parse().map_err(|e| invalid("LOG_FORMAT", e))?,
        };

        let cors_allow_origin = get("CORS_ALLOW_ORIGIN")
            .map(|origin| HeaderValue::from_str(&origin).map_err(|e| invalid("CORS_ALLOW_ORIGIN", e)))
            .transpose()?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            jwt_secret_is_default,
            jwt_ttl,
            database_url: get("DATABASE_URL").map(SecretString::from),
            cookie_secure,
            log_format,
            cors_allow_origin,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: ToString,
{
    raw.map_or(Ok(default), |v| v.parse().map_err(|e: T::Err| invalid(key, e)))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(config.jwt_secret_is_default);
        assert_eq!(config.jwt_ttl, chrono::Duration::hours(168));
        assert!(config.database_url.is_none());
        assert!(!config.cookie_secure);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.cors_allow_origin.is_none());
    }

    #[test]
    fn explicit_values() {
        let config = load(&[
            ("BILLFORGE_HOST", "127.0.0.1"),
            ("BILLFORGE_PORT", "3000"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_HOURS", "12"),
            ("COOKIE_SECURE", "true"),
            ("LOG_FORMAT", "pretty"),
            ("CORS_ALLOW_ORIGIN", "https://app.example.in"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.jwt_secret.expose_secret(), "s3cret");
        assert!(!config.jwt_secret_is_default);
        assert_eq!(config.jwt_ttl, chrono::Duration::hours(12));
        assert!(config.cookie_secure);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn production_requires_a_secret() {
        let err = load(&[("BILLFORGE_ENV", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "JWT_SECRET"));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(load(&[("BILLFORGE_PORT", "http")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(load(&[("JWT_TTL_HOURS", "0")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(load(&[("COOKIE_SECURE", "maybe")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(load(&[("LOG_FORMAT", "xml")]), Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn token_lifetime_is_bounded() {
        for raw in ["9223372036854775807", "8785", "-1"] {
            let err = load(&[("JWT_TTL_HOURS", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "JWT_TTL_HOURS"), "{raw}");
        }
        let config = load(&[("JWT_TTL_HOURS", "8784")]).unwrap();
        assert_eq!(config.jwt_ttl, chrono::Duration::days(366));
    }
}
