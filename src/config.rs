// tutor-calendar/src/config.rs
//! Server configuration read from environment variables (`.env` in debug builds).

use crate::db::DEFAULT_POOL_MAX_SIZE;
use std::env;

pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
const DEFAULT_FRONTEND_URL_DEV: &str = "http://localhost:3000";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in environment variables or .env file")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub pool_max_size: u32,
    pub default_timezone: String,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let pool_max_size = match get("DB_POOL_MAX_SIZE") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "DB_POOL_MAX_SIZE",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "DB_POOL_MAX_SIZE",
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_POOL_MAX_SIZE,
        };

        let allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => {
                let mut origins = Vec::new();
                if let Some(prod) = get("FRONTEND_URL_PROD") {
                    origins.push(prod);
                }
                origins.push(
                    get("FRONTEND_URL_DEV").unwrap_or_else(|| DEFAULT_FRONTEND_URL_DEV.to_string()),
                );
                origins
            }
        };

        let default_timezone =
            get("DEFAULT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        let seed_demo_data = match get("SEED_DEMO_DATA") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "SEED_DEMO_DATA",
                value: raw.clone(),
                reason: "expected true/false".to_string(),
            })?,
            None => false,
        };

        Ok(AppConfig {
            database_url,
            host,
            port,
            allowed_origins,
            pool_max_size,
            default_timezone,
            seed_demo_data,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/tutor")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.pool_max_size, 10);
        assert_eq!(config.default_timezone, "Europe/Moscow");
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert!(!config.seed_demo_data);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(config_from(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tutor"),
            ("PORT", "9090"),
            ("DB_POOL_MAX_SIZE", "4"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("SEED_DEMO_DATA", "TRUE"),
            ("DEFAULT_TIMEZONE", "Europe/Samara"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.pool_max_size, 4);
        assert_eq!(
            config.allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(config.seed_demo_data);
        assert_eq!(config.default_timezone, "Europe/Samara");
    }

    #[test]
    fn frontend_urls_are_used_without_explicit_origin_list() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tutor"),
            ("FRONTEND_URL_PROD", "https://tutor.example"),
        ])
        .unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["https://tutor.example".to_string(), "http://localhost:3000".to_string()]
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config_from(&[("DATABASE_URL", "x"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        let err = config_from(&[("DATABASE_URL", "x"), ("DB_POOL_MAX_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DB_POOL_MAX_SIZE", .. }));
        let err = config_from(&[("DATABASE_URL", "x"), ("SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SEED_DEMO_DATA", .. }));
    }
}
