//! Headless delivery-person client: logs in, keeps the location gate running
//! and periodically logs the order console until interrupted.
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use delivery_hub::client::console::next_action;
use delivery_hub::client::{
    DeliveryApi, GateCadence, HttpApi, LocationGate, OrderConsole, Session, StaticLocation,
};
use delivery_hub::config::AgentConfig;
use delivery_hub::error::AppError;
use delivery_hub::models::delivery_person::AvailabilityStatus;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AgentConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let api: Arc<dyn DeliveryApi> = Arc::new(
        HttpApi::new(config.api_base_url.clone())
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?,
    );

    let session = Session::login(api, &config.email, &config.password)
        .await
        .map_err(|err| AppError::Unauthorized(err.alert_message()))?;
    let session = Arc::new(session);

    if config.go_active && !session.is_active() {
        if let Err(err) = session.set_availability(AvailabilityStatus::Active).await {
            warn!(error = %err, "failed to go active");
        }
    }

    let provider = Arc::new(StaticLocation::new(config.position));
    let gate = LocationGate::new(session.clone(), provider, GateCadence::default());
    let mut gate_handle = gate.spawn();

    let console = OrderConsole::new(session.clone());
    let mut ticker = time::interval(Duration::from_secs(config.console_refresh_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(api = %config.api_base_url, "courier agent started");

    loop {
        tokio::select! {
            _ = ticker.tick() => log_console(&console, &gate).await,
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!(error = %err, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    gate_handle.shutdown();
    if let Err(err) = session.logout().await {
        warn!(error = %err, "logout failed");
    }

    Ok(())
}

async fn log_console(console: &OrderConsole, gate: &LocationGate) {
    let gate_state = gate.snapshot();
    if gate_state.prompt_visible {
        warn!("location is off: enable location permission and services to keep tracking");
    }

    if let Err(err) = console.refresh().await {
        warn!(error = %err, "failed to refresh orders");
        return;
    }

    let orders = console.orders().await;
    let actionable = console.actionable().await.len();
    info!(
        orders = orders.len(),
        actionable,
        tracking = gate_state.tracking,
        "order console refreshed"
    );

    for order in &orders {
        let action = next_action(order).map(|action| action.label()).unwrap_or("-");
        info!(
            order_id = %order.id,
            status = %order.status,
            customer = %order.customer_name,
            action,
            "order"
        );
    }

    match console.stats().await {
        Ok(stats) => info!(
            today = stats.today,
            this_week = stats.this_week,
            this_month = stats.this_month,
            "delivered orders"
        ),
        Err(err) => warn!(error = %err, "failed to load order stats"),
    }
}
