//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use fleetdesk::{notifications::MqttSettings, session::CookiePolicy};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Backend REST API configuration
    pub backend: BackendConfig,
    /// Notification broker configuration
    pub broker: BrokerConfig,
    /// Session cookie attributes
    pub cookies: CookiePolicy,
    /// Page locales
    pub locales: LocaleConfig,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Prometheus exporter address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Prebuilt dashboard assets served behind the gate
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL every proxied path is appended to
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// When false, notifications are only delivered in-process
    pub enabled: bool,
    pub mqtt: MqttSettings,
}

#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub supported: Vec<String>,
    pub default: String,
}

/// Values given on the command line take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub backend_url: Option<String>,
    pub broker_host: Option<String>,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F, overrides: ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_u64 = |key: &str, default: u64| parse_or(&lookup, key, default);

        let bind = match overrides.bind {
            Some(bind) => bind,
            None => match lookup("SERVER_BIND") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{}' is not an IP:PORT address", raw),
                })?,
                None => SocketAddr::from(([127, 0, 0, 1], 3000)),
            },
        };

        // Backend configuration (REQUIRED)
        let base_url = overrides
            .backend_url
            .or_else(|| lookup("BACKEND_URL"))
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "BACKEND_URL".to_string(),
                hint: "Set it to the REST API base, e.g. https://api.example.com/v1".to_string(),
            })?;

        let backend = BackendConfig {
            base_url,
            timeout_secs: env_u64("BACKEND_TIMEOUT_SECS", 15),
        };

        let broker_port = match lookup("BROKER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "BROKER_PORT".to_string(),
                reason: format!("'{}' is not a TCP port", raw),
            })?,
            None => 1883,
        };

        let broker = BrokerConfig {
            enabled: parse_bool_or(&lookup, "BROKER_ENABLED", true),
            mqtt: MqttSettings {
                host: overrides
                    .broker_host
                    .or_else(|| lookup("BROKER_HOST"))
                    .unwrap_or_else(|| "localhost".to_string()),
                port: broker_port,
                keep_alive_secs: env_u64("BROKER_KEEP_ALIVE_SECS", 30),
                connect_timeout_secs: env_u64("BROKER_CONNECT_TIMEOUT_SECS", 5),
                username: lookup("BROKER_USERNAME"),
                password: lookup("BROKER_PASSWORD"),
            },
        };

        let cookies = CookiePolicy {
            secure: parse_bool_or(&lookup, "COOKIE_SECURE", false),
            domain: lookup("COOKIE_DOMAIN").filter(|d| !d.is_empty()),
            access_max_age_secs: env_u64("ACCESS_COOKIE_MAX_AGE_SECS", 60 * 60 * 24) as i64,
            refresh_max_age_secs: env_u64("REFRESH_COOKIE_MAX_AGE_SECS", 60 * 60 * 24 * 30)
                as i64,
        };

        let supported: Vec<String> = lookup("SUPPORTED_LOCALES")
            .unwrap_or_else(|| "en,ar".to_string())
            .split(',')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        let default = lookup("DEFAULT_LOCALE").unwrap_or_else(|| "en".to_string());

        let metrics_bind = match lookup("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{}' is not an IP:PORT address", raw),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            backend,
            broker,
            cookies,
            locales: LocaleConfig { supported, default },
            max_upload_bytes: env_u64("MAX_UPLOAD_BYTES", 10 * 1024 * 1024) as usize,
            metrics_bind,
            static_dir: overrides
                .static_dir
                .or_else(|| lookup("STATIC_DIR").map(PathBuf::from)),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backend.base_url.starts_with("http://")
            || self.backend.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                var: "BACKEND_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "BACKEND_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.locales.supported.is_empty() {
            return Err(ConfigError::Invalid {
                var: "SUPPORTED_LOCALES".to_string(),
                reason: "At least one locale is required".to_string(),
            });
        }

        if !self.locales.supported.contains(&self.locales.default) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_LOCALE".to_string(),
                reason: format!(
                    "Must be one of the supported locales ({})",
                    self.locales.supported.join(", ")
                ),
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_UPLOAD_BYTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.broker.enabled && self.broker.mqtt.port == 0 {
            return Err(ConfigError::Invalid {
                var: "BROKER_PORT".to_string(),
                reason: "Must be a valid TCP port".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a numeric variable with default fallback
fn parse_or<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
