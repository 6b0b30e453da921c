//! Service configuration loaded from environment variables (or `.env`).

use std::time::Duration;

use crate::services::reconciliation::MIN_RETRY_INTERVAL;

/// Settings for the payment processor integration.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    /// Fixed ISO currency for every checkout session, lowercase (e.g. `inr`).
    pub currency: String,
    /// Accepted clock skew for webhook signatures.
    pub webhook_tolerance: Duration,
    pub success_url: String,
    pub cancel_url: String,
}

/// How bearer tokens are verified.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Supabase JWKS (ES256), keyed by project ref.
    Jwks { project_ref: String, anon_key: String },
    /// Shared HS256 secret.
    Secret(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub reconcile_retry_interval: Duration,
    pub reconcile_max_attempts: i32,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Loads `.env` first if present. Fails when a required variable is
    /// missing or malformed.
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let database_url = required("DATABASE_URL")?;

        let auth = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => AuthConfig::Secret(secret),
            _ => {
                let supabase_url = required("SUPABASE_URL")?;
                let project_ref = supabase_url
                    .strip_prefix("https://")
                    .and_then(|s| s.strip_suffix(".supabase.co"))
                    .ok_or_else(|| {
                        "Invalid SUPABASE_URL format. Expected: https://PROJECT.supabase.co"
                            .to_string()
                    })?
                    .to_string();
                AuthConfig::Jwks {
                    project_ref,
                    anon_key: required("SUPABASE_ANON_KEY")?,
                }
            }
        };

        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let stripe = StripeConfig {
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            currency: std::env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| "inr".to_string())
                .to_lowercase(),
            webhook_tolerance: Duration::from_secs(parse_env("STRIPE_WEBHOOK_TOLERANCE_SECS", 300)),
            success_url: format!(
                "{client_url}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{client_url}/payment-cancelled"),
        };

        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            database_url,
            auth,
            stripe,
            reconcile_retry_interval: Duration::from_secs(parse_env("RECONCILE_RETRY_SECS", 60))
                .max(MIN_RETRY_INTERVAL),
            reconcile_max_attempts: parse_env("RECONCILE_MAX_ATTEMPTS", 10),
        })
    }
}

fn required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("{key} must be set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
