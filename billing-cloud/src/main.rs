//! billing-cloud: recurring billing for hosted tenant sites
//!
//! Long-running service that:
//! - Sweeps past-due subscriptions (grace start, reminders, deactivation)
//! - Reconciles payment gateway webhooks into the payment ledger
//! - Serves operator billing actions (mark paid, check, automate, cancel)

mod api;
mod auth;
mod billing;
mod config;
mod db;
mod email;
mod error;
mod gateway;
mod state;

use std::time::Duration;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billing_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting billing-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("billing-cloud HTTP listening on {http_addr}");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {e}");
        }
    });

    // In-process sweep; otherwise an external scheduler calls POST /api/billing/sweep
    if config.sweep_interval_secs > 0 {
        let sweep_state = state.clone();
        let period = Duration::from_secs(config.sweep_interval_secs);
        tracing::info!(interval_secs = config.sweep_interval_secs, "Billing sweep timer enabled");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let now = shared::util::now_millis();
                if let Err(e) = billing::sweep::run_sweep(&sweep_state, now).await {
                    tracing::error!(error = %e, "Scheduled billing sweep failed");
                }
            }
        });
    }

    http_handle.await?;

    Ok(())
}
