//! # Configuration Module
//!
//! This module defines the bot configuration: Telegram credentials, SMTP
//! settings for order notifications, the CNY→RUB exchange rate, the shipping
//! catalog and the deployment mode. Everything is read once at startup and
//! shared by reference afterwards.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::session::ShippingMethod;

// Defaults for optional settings
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EXCHANGE_RATE: f64 = 13.0;
pub const DEFAULT_WEBHOOK_PORT: u16 = 10000;

/// Errors raised while building [`BotConfig`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// One or more required keys are absent or empty
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    /// A key is present but cannot be parsed
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// SMTP settings used by the notification mailer
#[derive(Clone)]
pub struct EmailSettings {
    /// Admin address: sender, recipient and SMTP login
    pub address: String,
    pub password: String,
    pub server: String,
    pub port: u16,
    pub timeout: Duration,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One entry of the shipping catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingOption {
    pub method: ShippingMethod,
    /// Display name shown on buttons and in the order summary
    pub name: String,
    /// Price per kilogram in RUB
    pub price_per_kg: u32,
    pub min_days: u8,
    pub max_days: u8,
}

impl ShippingOption {
    /// Delivery time formatted as `min-max`
    pub fn days(&self) -> String {
        format!("{}-{}", self.min_days, self.max_days)
    }
}

/// Read-only catalog of the three shipping options
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingCatalog {
    options: Vec<ShippingOption>,
}

impl ShippingCatalog {
    pub fn options(&self) -> &[ShippingOption] {
        &self.options
    }

    pub fn get(&self, method: ShippingMethod) -> Option<&ShippingOption> {
        self.options.iter().find(|option| option.method == method)
    }
}

impl Default for ShippingCatalog {
    fn default() -> Self {
        Self {
            options: vec![
                ShippingOption {
                    method: ShippingMethod::Truck,
                    name: "🚚 Грузовик (бесплатно)".to_string(),
                    price_per_kg: 0,
                    min_days: 18,
                    max_days: 21,
                },
                ShippingOption {
                    method: ShippingMethod::Air,
                    name: "✈️ Авиа".to_string(),
                    price_per_kg: 1300,
                    min_days: 12,
                    max_days: 15,
                },
                ShippingOption {
                    method: ShippingMethod::Express,
                    name: "⚡️ Экспресс".to_string(),
                    price_per_kg: 2500,
                    min_days: 1,
                    max_days: 5,
                },
            ],
        }
    }
}

/// Settings for the hosted webhook deployment
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookSettings {
    /// Public hostname, the webhook URL is `https://{host}/webhook`
    pub host: String,
    /// Local port the listener binds to
    pub port: u16,
    /// Secret token Telegram echoes back in every webhook request
    pub secret: Option<String>,
}

/// How updates reach the bot
#[derive(Debug, Clone, PartialEq)]
pub enum Deployment {
    Polling,
    Webhook(WebhookSettings),
}

/// Main configuration structure for the bot
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub email: EmailSettings,
    /// RUB per one CNY
    pub exchange_rate: f64,
    pub shipping: ShippingCatalog,
    pub deployment: Deployment,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("exchange_rate", &self.exchange_rate)
            .field("shipping", &self.shipping)
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl BotConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// All required keys are checked before any error is returned, so a
    /// misconfigured deployment reports every missing key at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| clean_value(&v)).filter(|v| !v.is_empty());

        let token = get("TELEGRAM_BOT_TOKEN");
        let address = get("ADMIN_EMAIL");
        let password = get("EMAIL_PASSWORD");
        let production = is_hosted(lookup("RENDER").as_deref());
        let host = get("RENDER_EXTERNAL_HOSTNAME");

        let mut missing = Vec::new();
        if token.is_none() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if address.is_none() {
            missing.push("ADMIN_EMAIL");
        }
        if password.is_none() {
            missing.push("EMAIL_PASSWORD");
        }
        if production && host.is_none() {
            missing.push("RENDER_EXTERNAL_HOSTNAME");
        }

        let (Some(token), Some(address), Some(password)) = (token, address, password) else {
            return Err(ConfigError::Missing(missing));
        };
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let exchange_rate = parse_or("EXCHANGE_RATE", get("EXCHANGE_RATE"), DEFAULT_EXCHANGE_RATE)?;
        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "EXCHANGE_RATE",
                value: exchange_rate.to_string(),
            });
        }

        let email = EmailSettings {
            address,
            password,
            server: get("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            port: parse_or("SMTP_PORT", get("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
            timeout: Duration::from_secs(parse_or(
                "SMTP_TIMEOUT",
                get("SMTP_TIMEOUT"),
                DEFAULT_SMTP_TIMEOUT_SECS,
            )?),
        };

        let deployment = match host {
            Some(host) if production => Deployment::Webhook(WebhookSettings {
                host,
                port: parse_or("PORT", get("PORT"), DEFAULT_WEBHOOK_PORT)?,
                secret: get("WEBHOOK_SECRET"),
            }),
            _ => Deployment::Polling,
        };

        Ok(Self {
            token,
            email,
            exchange_rate,
            shipping: ShippingCatalog::default(),
            deployment,
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.deployment, Deployment::Webhook(_))
    }
}

/// Whether a `RENDER` value marks a hosted deployment
pub fn is_hosted(render: Option<&str>) -> bool {
    render.is_some_and(|v| clean_value(v).eq_ignore_ascii_case("true"))
}

/// Strip surrounding whitespace and quotes left over from `.env` files
fn clean_value(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
        .to_string()
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}
