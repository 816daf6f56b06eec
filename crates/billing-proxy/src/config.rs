//! Configuration for the billing proxy.

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Billing provider configuration
    #[serde(default)]
    pub billing: BillingConfig,

    /// Token signing configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// User store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// iTelBilling base URL
    #[serde(default = "default_billing_base_url")]
    pub base_url: String,

    /// Egress IP registered with the provider
    #[serde(default)]
    pub allowed_ip: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_billing_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens (required)
    #[serde(default)]
    pub token_secret: Option<SecretString>,

    /// Access token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the encrypted user store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, users are kept in memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Store encryption secret; falls back to the token secret
    #[serde(default)]
    pub secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_url: default_billing_base_url(),
            allowed_ip: None,
            timeout_secs: default_billing_timeout_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            persist: true,
            secret: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_billing_base_url() -> String {
    "http://sip.myswitch.com".into()
}

fn default_billing_timeout_secs() -> u64 {
    30
}

fn default_token_ttl_hours() -> u64 {
    48
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/data/users.enc")
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl BillingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours as i64)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.token_secret().is_none() {
            bail!("AUTH__TOKEN_SECRET is missing");
        }
        if self.billing.base_url.trim().is_empty() {
            bail!("BILLING__BASE_URL must not be empty");
        }
        if self.billing.timeout_secs == 0 {
            bail!("BILLING__TIMEOUT_SECS must be positive");
        }
        Ok(())
    }

    /// The token secret, if configured and non-empty.
    pub fn token_secret(&self) -> Option<&SecretString> {
        self.auth
            .token_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
    }

    /// Secret the user store key is derived from.
    pub fn store_secret(&self) -> Option<&SecretString> {
        self.store
            .secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
            .or_else(|| self.token_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            billing: BillingConfig::default(),
            auth: AuthConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let config = base_config();
        assert_eq!(config.billing.base_url, "http://sip.myswitch.com");
        assert_eq!(config.billing.timeout(), Duration::from_secs(30));
        assert_eq!(config.auth.token_ttl(), chrono::Duration::hours(48));
        assert_eq!(config.server.port, 3000);
        assert!(config.store.persist);
    }

    #[test]
    fn test_missing_token_secret_fails_validation() {
        let config = base_config();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AUTH__TOKEN_SECRET"));
    }

    #[test]
    fn test_blank_token_secret_fails_validation() {
        let mut config = base_config();
        config.auth.token_secret = Some(SecretString::new("   ".into()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_secret_falls_back_to_token_secret() {
        let mut config = base_config();
        config.auth.token_secret = Some(SecretString::new("token".into()));
        assert!(config.validate().is_ok());
        assert_eq!(config.store_secret().unwrap().expose_secret(), "token");

        config.store.secret = Some(SecretString::new("store".into()));
        assert_eq!(config.store_secret().unwrap().expose_secret(), "store");
    }

    #[test]
    fn test_deserialize_from_nested_map() {
        let source = config::Config::builder()
            .set_override("auth.token_secret", "s3cret")
            .unwrap()
            .set_override("billing.base_url", "http://billing.test")
            .unwrap()
            .set_override("server.port", "8088")
            .unwrap()
            .build()
            .unwrap();

        let config: Config = source.try_deserialize().unwrap();
        assert_eq!(config.billing.base_url, "http://billing.test");
        assert_eq!(config.server.port, 8088);
        assert!(config.validate().is_ok());
    }
}
