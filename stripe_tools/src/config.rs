use cpg_common::Secret;
use log::*;

pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// The API base url, without a trailing slash. Overridable so that tests can point at a local mock.
    pub api_url: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Webhooks signed longer ago than this many seconds are rejected.
    pub webhook_tolerance: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_STRIPE_API_URL.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            webhook_tolerance: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("CPG_STRIPE_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_STRIPE_API_URL.to_string());
        let secret_key = Secret::new(std::env::var("CPG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ CPG_STRIPE_SECRET_KEY not set. Payment intents cannot be created.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("CPG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ CPG_STRIPE_WEBHOOK_SECRET not set. Signed webhooks will be rejected.");
            String::default()
        }));
        let webhook_tolerance = std::env::var("CPG_STRIPE_WEBHOOK_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid value for CPG_STRIPE_WEBHOOK_TOLERANCE ({s}). {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);
        Self { api_url, secret_key, webhook_secret, webhook_tolerance }
    }
}
