use std::{env, time::Duration};

use checkout_engine::RetryPolicy;
use cpg_common::{helpers::parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_CPG_HOST: &str = "127.0.0.1";
const DEFAULT_CPG_PORT: u16 = 8360;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EMAIL_API_URL: &str = "https://api.brevo.com";
const DEFAULT_QUEUE_SIZE: usize = 64;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// ISO currency code that all prices are charged in.
    pub currency: String,
    pub auth: AuthConfig,
    /// Receives copies of order and payment notifications. Admin emails are not sent if this is empty.
    pub admin_email: Option<String>,
    pub stripe: StripeConfig,
    /// If true, webhook deliveries without a signature header are decoded without verification. **DANGER**. Only for
    /// local development against a gateway simulator.
    pub allow_unsigned_webhooks: bool,
    pub email: EmailConfig,
    pub notifications: NotificationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CPG_HOST.to_string(),
            port: DEFAULT_CPG_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            auth: AuthConfig::default(),
            admin_email: None,
            stripe: StripeConfig::default(),
            allow_unsigned_webhooks: false,
            email: EmailConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CPG_HOST").ok().unwrap_or_else(|| DEFAULT_CPG_HOST.into());
        let port = env::var("CPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CPG_PORT. {e} Using the default, {DEFAULT_CPG_PORT}, instead."
                    );
                    DEFAULT_CPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CPG_PORT);
        let database_url = env::var("CPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CPG_DATABASE_URL is not set. Please set it to the URL for the checkout database.");
            String::default()
        });
        let max_connections = parse_number("CPG_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let currency = env::var("CPG_CURRENCY")
            .map(|s| s.trim().to_lowercase())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the authentication configuration. {e}. Reverting to the default configuration.");
            AuthConfig::default()
        });
        let admin_email = env::var("CPG_ADMIN_EMAIL").ok().filter(|s| !s.trim().is_empty());
        let stripe = StripeConfig::new_from_env_or_default();
        let allow_unsigned_webhooks = parse_boolean_flag(env::var("CPG_ALLOW_UNSIGNED_WEBHOOKS").ok(), false);
        if allow_unsigned_webhooks {
            warn!(
                "🚨️🚨️🚨️ CPG_ALLOW_UNSIGNED_WEBHOOKS is set. Webhooks without a signature will be trusted. Never run a \
                 production instance like this. 🚨️🚨️🚨️"
            );
        }
        let email = EmailConfig::from_env_or_default();
        let notifications = NotificationConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            max_connections,
            currency,
            auth,
            admin_email,
            stripe,
            allow_unsigned_webhooks,
            email,
            notifications,
        }
    }
}

fn parse_number<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T
where T::Err: std::fmt::Display {
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}.");
            default
        }),
        Err(_) => default,
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 key shared with the service that issues access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No externally issued \
             token will be accepted. Set CPG_JWT_SECRET to fix this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("CPG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [CPG_JWT_SECRET]")))?;
        if secret.trim().len() < 16 {
            return Err(ServerError::ConfigurationError("CPG_JWT_SECRET must be at least 16 characters long".into()));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  EmailConfig  ------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub sender_email: String,
    pub sender_name: String,
}

impl EmailConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = env::var("CPG_EMAIL_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_EMAIL_API_URL.to_string());
        let api_key = Secret::new(env::var("CPG_EMAIL_API_KEY").unwrap_or_default());
        let sender_email = env::var("CPG_EMAIL_SENDER").unwrap_or_default();
        let sender_name = env::var("CPG_EMAIL_SENDER_NAME").unwrap_or_else(|_| "Checkout".to_string());
        let config = Self { api_url, api_key, sender_email, sender_name };
        if !config.is_configured() {
            info!("🪛️ CPG_EMAIL_API_KEY or CPG_EMAIL_SENDER is not set. Emails will be logged instead of sent.");
        }
        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.sender_email.is_empty()
    }
}

//-------------------------------------------------  NotificationConfig  -----------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct NotificationConfig {
    pub queue_size: usize,
    pub retry: RetryPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { queue_size: DEFAULT_QUEUE_SIZE, retry: RetryPolicy::default() }
    }
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = RetryPolicy::default();
        let queue_size = parse_number("CPG_NOTIFICATION_QUEUE_SIZE", DEFAULT_QUEUE_SIZE);
        let max_retries = parse_number("CPG_NOTIFICATION_MAX_RETRIES", defaults.max_retries);
        #[allow(clippy::cast_possible_truncation)]
        let backoff_ms = parse_number("CPG_NOTIFICATION_BACKOFF_MS", defaults.backoff.as_millis() as u64);
        Self { queue_size, retry: RetryPolicy { max_retries, backoff: Duration::from_millis(backoff_ms) } }
    }
}
