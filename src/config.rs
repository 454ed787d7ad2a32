// Configuration File Support
//
// TOML configuration for the tracked accounts service with environment
// variable overrides. The default file lives in the XDG config directory:
// ~/.config/tracked-accounts/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::accounts::LimitEnforcement;
use crate::entitlement::TRACKED_ACCOUNTS_FEATURE;
use crate::issuer::IssuerUrl;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Identity provider configuration
    pub identity: IdentityConfig,

    /// Entitlement lookup configuration
    pub entitlements: EntitlementsConfig,

    /// Quota enforcement configuration
    pub quota: QuotaConfig,

    /// Account store configuration
    pub store: StoreConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl LoggingConfig {
    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Issuer base address (required)
    pub issuer_url: Option<String>,

    /// Cookie holding the access token for browser sessions
    pub session_cookie: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            issuer_url: None,
            session_cookie: "access_token".to_string(),
        }
    }
}

/// Entitlement lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EntitlementsConfig {
    /// Feature key carrying the tracked accounts cap
    pub feature_key: String,

    /// Timeout in seconds for identity and entitlement requests
    pub timeout_secs: u64,
}

impl Default for EntitlementsConfig {
    fn default() -> Self {
        Self {
            feature_key: TRACKED_ACCOUNTS_FEATURE.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Quota enforcement configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QuotaConfig {
    /// soft or strict
    pub enforcement: LimitEnforcement,
}

/// Account store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Account store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use
    pub backend: StoreBackend,

    /// SQLite database file (sqlite backend only)
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: "tracked_accounts.db".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to expose /metrics
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields defaults. Environment overrides are applied and
    /// the result is validated either way, so a missing issuer is always
    /// reported.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/tracked-accounts/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) =
            directories::ProjectDirs::from("com", "tracked-accounts", "tracked-accounts")
        {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("tracked-accounts")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - TRACKED_ACCOUNTS_LOG_LEVEL / TRACKED_ACCOUNTS_LOG_FORMAT
    /// - TRACKED_ACCOUNTS_BIND
    /// - TRACKED_ACCOUNTS_ISSUER_URL (falls back to KINDE_ISSUER_URL)
    /// - TRACKED_ACCOUNTS_ENFORCEMENT
    /// - TRACKED_ACCOUNTS_STORE / TRACKED_ACCOUNTS_SQLITE_PATH
    /// - TRACKED_ACCOUNTS_METRICS_ENABLED
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("TRACKED_ACCOUNTS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TRACKED_ACCOUNTS_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(bind) = std::env::var("TRACKED_ACCOUNTS_BIND") {
            self.server.bind = bind;
        }

        if let Ok(issuer) = std::env::var("TRACKED_ACCOUNTS_ISSUER_URL") {
            self.identity.issuer_url = Some(issuer);
        } else if self.identity.issuer_url.is_none() {
            if let Ok(issuer) = std::env::var("KINDE_ISSUER_URL") {
                self.identity.issuer_url = Some(issuer);
            }
        }

        if let Ok(enforcement) = std::env::var("TRACKED_ACCOUNTS_ENFORCEMENT") {
            match enforcement.parse() {
                Ok(enforcement) => self.quota.enforcement = enforcement,
                Err(e) => tracing::warn!("Ignoring TRACKED_ACCOUNTS_ENFORCEMENT: {}", e),
            }
        }

        if let Ok(backend) = std::env::var("TRACKED_ACCOUNTS_STORE") {
            match backend.trim().to_lowercase().as_str() {
                "sqlite" => self.store.backend = StoreBackend::Sqlite,
                "memory" => self.store.backend = StoreBackend::Memory,
                other => tracing::warn!("Ignoring unknown TRACKED_ACCOUNTS_STORE: {}", other),
            }
        }
        if let Ok(path) = std::env::var("TRACKED_ACCOUNTS_SQLITE_PATH") {
            self.store.sqlite_path = path;
        }

        if let Ok(enabled) = std::env::var("TRACKED_ACCOUNTS_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(self.metrics.enabled);
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        self.bind_addr()?;
        self.issuer()?;

        if self.identity.session_cookie.trim().is_empty() {
            anyhow::bail!("Session cookie name must not be empty");
        }

        if self.entitlements.feature_key.trim().is_empty() {
            anyhow::bail!("Entitlement feature key must not be empty");
        }
        if self.entitlements.timeout_secs == 0 {
            anyhow::bail!("Entitlement timeout must be > 0 seconds");
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.sqlite_path.trim().is_empty() {
            anyhow::bail!("SQLite store requires a non-empty sqlite_path");
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))
    }

    /// Validated issuer address
    pub fn issuer(&self) -> Result<IssuerUrl> {
        IssuerUrl::from_config(self.identity.issuer_url.as_deref())
            .context("Identity issuer is required (set identity.issuer_url or TRACKED_ACCOUNTS_ISSUER_URL)")
    }

    /// Timeout for calls to the identity provider
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.entitlements.timeout_secs)
    }
}
