//! Billing service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port (API + webhook)
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Payment gateway API access token
    pub gateway_access_token: String,
    /// Payment gateway webhook signing secret (empty = signature not checked)
    pub gateway_webhook_secret: String,
    /// Payment gateway REST base URL
    pub gateway_base_url: String,
    /// Timeout for every gateway call
    pub gateway_timeout_ms: u64,
    /// ISO currency for recurring payments
    pub gateway_currency: String,
    /// Where the gateway sends the payer after authorizing
    pub gateway_back_url: String,
    /// SES sender email address
    pub ses_from_email: String,
    /// Bearer token for operator endpoints
    pub operator_token: String,
    /// In-process sweep interval (0 = external scheduler only)
    pub sweep_interval_secs: u64,
    /// Subscriptions processed concurrently by one sweep
    pub sweep_concurrency: usize,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let webhook_secret = if environment == "development" {
            std::env::var("GATEWAY_WEBHOOK_SECRET").unwrap_or_default()
        } else {
            Self::require_secret("GATEWAY_WEBHOOK_SECRET", &environment)?
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: Self::parse_or("HTTP_PORT", 8080),
            gateway_access_token: Self::require_secret("GATEWAY_ACCESS_TOKEN", &environment)?,
            gateway_webhook_secret: webhook_secret,
            gateway_base_url: std::env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".into()),
            gateway_timeout_ms: Self::parse_or("GATEWAY_TIMEOUT_MS", 10_000),
            gateway_currency: std::env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "ARS".into()),
            gateway_back_url: std::env::var("GATEWAY_BACK_URL")
                .unwrap_or_else(|_| "https://app.example.com/billing".into()),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "billing@example.com".into()),
            operator_token: Self::require_secret("OPERATOR_TOKEN", &environment)?,
            sweep_interval_secs: Self::parse_or("SWEEP_INTERVAL_SECS", 0),
            sweep_concurrency: Self::parse_or("SWEEP_CONCURRENCY", 4_usize).max(1),
            environment,
        })
    }
}
