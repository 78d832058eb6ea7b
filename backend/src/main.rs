//! Backend entry-point: loads settings, runs migrations, wires the lifecycle
//! engine to PostgreSQL and the Bot API, and serves the webhooks.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use subscription_backend::domain::ports::{NotificationPort, RecordStore, SubscriptionCommands};
use subscription_backend::inbound::http::health::HealthState;
use subscription_backend::outbound::persistence::{
    DbPool, DieselRecordStore, PoolConfig, run_migrations,
};
use subscription_backend::outbound::telegram::TelegramNotifier;
use subscription_backend::server::{
    BackgroundTasks, EngineParts, ServerConfig, build_engine, create_server,
};
use subscription_backend::settings::Settings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = Settings::load_runtime().wrap_err("invalid configuration")?;

    run_migrations(&settings.database_url)
        .await
        .wrap_err("database migrations failed")?;
    let pool = DbPool::new(PoolConfig::new(settings.database_url.as_str()))
        .await
        .wrap_err("database pool unavailable")?;

    let store: Arc<dyn RecordStore> = Arc::new(DieselRecordStore::new(pool));
    let notifier: Arc<dyn NotificationPort> = Arc::new(
        TelegramNotifier::new(settings.telegram).wrap_err("failed to build Bot API client")?,
    );
    let EngineParts {
        engine,
        fired,
        clock,
    } = build_engine(store, notifier, settings.lifecycle);

    let tasks = BackgroundTasks::start(Arc::clone(&engine), fired, clock).await;

    let server_config = ServerConfig::new(settings.bind_address)
        .with_payment_secret(settings.webhook_secret.as_deref().map(String::as_str))
        .with_telegram_secret(settings.telegram_secret_token.as_deref().map(String::as_str));
    info!(bind_address = %server_config.bind_addr(), "starting HTTP server");

    let health_state = web::Data::new(HealthState::new());
    let commands: Arc<dyn SubscriptionCommands> = engine;
    let result = match create_server(health_state.clone(), commands, server_config) {
        Ok(server) => server.await,
        Err(err) => Err(err),
    };

    health_state.mark_unhealthy();
    tasks.shutdown();
    result.wrap_err("HTTP server failed")
}
