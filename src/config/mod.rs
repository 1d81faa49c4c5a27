//! Configuration loading for the SAKINA API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `SAKINA_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing;

const ENV_PREFIX: &str = "SAKINA_";
const MIN_JWT_SECRET_BYTES: usize = 32;
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `SAKINA_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_margin_percent")]
    pub default_margin_percent: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: default_dev_jwt_secret(),
            default_margin_percent: default_margin_percent(),
            currency: default_currency(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Local and test profiles relax secret requirements.
    pub fn is_development(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.jwt_secret.is_empty() {
            config.jwt_secret = REDACTED.to_string();
        }
        if let Some((scheme, rest)) = config.database_url.split_once("://")
            && let Some((_credentials, host)) = rest.rsplit_once('@')
        {
            config.database_url = format!("{scheme}://{REDACTED}@{host}");
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if !self.is_development() && self.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::WeakJwtSecret {
                length: self.jwt_secret.len(),
                min: MIN_JWT_SECRET_BYTES,
            });
        }

        if pricing::validate_margin(self.default_margin_percent).is_err() {
            return Err(ConfigError::InvalidDefaultMargin {
                value: self.default_margin_percent,
            });
        }

        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidCurrency {
                value: self.currency.clone(),
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "DB_MAX_CONNECTIONS".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://sakina.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_margin_percent() -> f64 {
    10.0
}

fn default_currency() -> String {
    "SAR".to_string()
}

fn default_dev_jwt_secret() -> String {
    "sakina-local-development-secret-change-me".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("JWT secret is missing; set SAKINA_JWT_SECRET")]
    MissingJwtSecret,
    #[error("JWT secret must be at least {min} bytes outside local/test profiles, got {length}")]
    WeakJwtSecret { length: usize, min: usize },
    #[error("default margin must be between 0 and 1000 percent, got {value}")]
    InvalidDefaultMargin { value: f64 },
    #[error("currency must be a three-letter uppercase code, got '{value}'")]
    InvalidCurrency { value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("invalid numeric value for {key}: '{value}'")]
    InvalidNumber { key: String, value: String },
}

/// Loads configuration using layered `.env` files and `SAKINA_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
    read_process_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            read_process_env: true,
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            read_process_env: true,
        }
    }

    /// Only read `.env` files, ignoring process environment variables.
    pub fn files_only(mut self) -> Self {
        self.read_process_env = false;
        self
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        if self.read_process_env {
            for (key, value) in env::vars() {
                if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                    layered.insert(stripped.to_string(), value);
                }
            }
        }

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let api_bind_addr = take("API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(default_log_format);
        let database_url = take("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = parse_number(take("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms =
            parse_number(take("DB_ACQUIRE_TIMEOUT_MS"), "DB_ACQUIRE_TIMEOUT_MS")?
                .unwrap_or_else(default_db_acquire_timeout_ms);
        let default_margin_percent =
            parse_number(take("DEFAULT_MARGIN_PERCENT"), "DEFAULT_MARGIN_PERCENT")?
                .unwrap_or_else(default_margin_percent);
        let currency = take("CURRENCY")
            .map(|v| v.trim().to_ascii_uppercase())
            .unwrap_or_else(default_currency);
        let cors_allowed_origins = take("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let jwt_secret = match take("JWT_SECRET") {
            Some(secret) => secret,
            None if matches!(profile.as_str(), "local" | "test") => default_dev_jwt_secret(),
            None => String::new(),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            default_margin_percent,
            currency,
            cors_allowed_origins,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let process_profile = if self.read_process_env {
            env::var(format!("{ENV_PREFIX}PROFILE")).ok()
        } else {
            None
        };
        let profile = process_profile
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value,
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn short_secret_rejected_outside_development() {
        let config = AppConfig {
            profile: "production".to_string(),
            jwt_secret: "too-short".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeakJwtSecret { length: 9, .. })
        ));

        let config = AppConfig {
            profile: "test".to_string(),
            jwt_secret: "too-short".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_margin_and_currency_rejected() {
        let config = AppConfig {
            default_margin_percent: -5.0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDefaultMargin { .. })
        ));

        let config = AppConfig {
            currency: "riyal".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            jwt_secret: "super-secret-value-that-is-long-enough".to_string(),
            database_url: "postgres://sakina:hunter2@db:5432/sakina".to_string(),
            ..AppConfig::default()
        };

        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret-value"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("db:5432/sakina"));
    }

    #[test]
    fn parse_number_reports_key() {
        let err = parse_number::<u32>(Some("ten".to_string()), "DB_MAX_CONNECTIONS").unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
        assert_eq!(parse_number::<u32>(None, "X").unwrap(), None);
    }
}
