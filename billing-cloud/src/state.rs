//! Application state for billing-cloud

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::{BillingStore, PgBillingStore};
use crate::email::{Notifier, SesNotifier};
use crate::gateway::{HttpGateway, PaymentGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Billing knobs read by the core
#[derive(Debug, Clone)]
pub struct BillingSettings {
    /// ISO currency for recurring payments
    pub currency: String,
    /// Subscriptions processed concurrently by one sweep
    pub sweep_concurrency: usize,
    /// Upper bound for a single gateway call
    pub gateway_timeout: Duration,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Billing persistence
    pub store: Arc<dyn BillingStore>,
    /// Recurring-payment provider client (constructed once)
    pub gateway: Arc<dyn PaymentGateway>,
    /// Tenant notification sender
    pub notifier: Arc<dyn Notifier>,
    pub settings: BillingSettings,
    /// Webhook signing secret (empty = signature not checked)
    pub webhook_secret: String,
    /// Bearer token for operator endpoints
    pub operator_token: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        let gateway_timeout = Duration::from_millis(config.gateway_timeout_ms);
        let gateway = HttpGateway::new(
            &config.gateway_base_url,
            &config.gateway_access_token,
            &config.gateway_back_url,
            gateway_timeout,
        )?;

        if config.gateway_webhook_secret.is_empty() {
            tracing::warn!("GATEWAY_WEBHOOK_SECRET not set, webhook signatures are not verified");
        }

        Ok(Self {
            store: Arc::new(PgBillingStore::new(pool)),
            gateway: Arc::new(gateway),
            notifier: Arc::new(SesNotifier::new(ses, config.ses_from_email.clone())),
            settings: BillingSettings {
                currency: config.gateway_currency.clone(),
                sweep_concurrency: config.sweep_concurrency,
                gateway_timeout,
            },
            webhook_secret: config.gateway_webhook_secret.clone(),
            operator_token: config.operator_token.clone(),
        })
    }
}
