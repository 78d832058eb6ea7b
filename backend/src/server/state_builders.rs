//! Builders that wire adapters into the lifecycle engine and HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tokio::sync::mpsc;

use crate::domain::TimerFired;
use crate::domain::lifecycle::{LifecycleConfig, LifecycleEngine, LifecyclePorts};
use crate::domain::ports::{NotificationPort, RecordStore, SubscriptionCommands};
use crate::inbound::http::state::HttpState;
use crate::outbound::timers::TokioTimerRegistry;

use super::ServerConfig;

/// Engine plus the receiving end of its timer registry.
pub struct EngineParts {
    pub engine: Arc<LifecycleEngine>,
    pub fired: mpsc::UnboundedReceiver<TimerFired>,
    pub clock: Arc<dyn Clock>,
}

/// Build the engine over the given store and notifier with tokio timers and
/// the system clock.
pub fn build_engine(
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn NotificationPort>,
    config: LifecycleConfig,
) -> EngineParts {
    let (timers, fired) = TokioTimerRegistry::new();
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let engine = LifecycleEngine::new(
        LifecyclePorts::new(store, notifier, Arc::new(timers)),
        Arc::clone(&clock),
        config,
    );
    EngineParts {
        engine: Arc::new(engine),
        fired,
        clock,
    }
}

/// HTTP handler state for the configured webhook secrets.
pub fn build_http_state(
    config: &ServerConfig,
    commands: Arc<dyn SubscriptionCommands>,
) -> web::Data<HttpState> {
    web::Data::new(
        HttpState::new(commands)
            .with_payment_secret(config.payment_secret.clone())
            .with_telegram_secret(config.telegram_secret.clone()),
    )
}
