//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use payments::PayPalConfig;
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";
const DEFAULT_PAYPAL_BASE_URL: &str = "https://api-m.sandbox.paypal.com";

/// A variable was set to something that cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `DATABASE_URL`: PostgreSQL connection; in-memory store when unset
/// - `JWT_SECRET`, `JWT_EXPIRATION_MINUTES`: token signing (default 120 minutes)
/// - `PAYPAL_CLIENT_ID`, `PAYPAL_SECRET`, `PAYPAL_BASE_URL`: provider
///   credentials; an in-memory provider is used when the credentials are unset
/// - `PAYMENT_CURRENCY` (default `USD`), `PAYMENT_TIMEOUT_SECS` (default 10)
/// - `ADMIN_EMAILS`: comma-separated emails that register as admins
/// - `UPLOAD_DIR`: where uploaded images and attachments are written
///   (default `uploads`)
///
/// `RUST_LOG` is read by the tracing filter directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub paypal: Option<PayPalConfig>,
    pub payment_currency: String,
    pub payment_timeout: Duration,
    pub admin_emails: Vec<String>,
    pub upload_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from any name → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let payment_currency = var("PAYMENT_CURRENCY").unwrap_or(defaults.payment_currency);
        let payment_timeout = match var("PAYMENT_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse("PAYMENT_TIMEOUT_SECS", v)?),
            None => defaults.payment_timeout,
        };

        let paypal = match (var("PAYPAL_CLIENT_ID"), var("PAYPAL_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(PayPalConfig {
                base_url: var("PAYPAL_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PAYPAL_BASE_URL.to_string()),
                client_id,
                client_secret,
                currency: payment_currency.clone(),
                timeout: payment_timeout,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: match var("PORT") {
                Some(v) => parse("PORT", v)?,
                None => defaults.port,
            },
            log_format: match var("LOG_FORMAT").as_deref() {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: var("DATABASE_URL"),
            jwt_secret: var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration_minutes: match var("JWT_EXPIRATION_MINUTES") {
                Some(v) => parse("JWT_EXPIRATION_MINUTES", v)?,
                None => defaults.jwt_expiration_minutes,
            },
            paypal,
            payment_currency,
            payment_timeout,
            admin_emails: var("ADMIN_EMAILS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when the token secret was left at its development default.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError { name, value })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_format: LogFormat::Pretty,
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_minutes: 120,
            paypal: None,
            payment_currency: "USD".to_string(),
            payment_timeout: Duration::from_secs(10),
            admin_emails: Vec::new(),
            upload_dir: PathBuf::from("uploads"),
        }
    }
}
