//! Single consumer for fired timers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::TimerFired;
use crate::domain::lifecycle::LifecycleEngine;

/// Apply fired timers to the engine one at a time until every sender is gone.
///
/// A store failure is logged and the command dropped; the daily sweep
/// re-derives any disclaimer step that was missed.
pub async fn run_timer_dispatcher(
    mut fired: mpsc::UnboundedReceiver<TimerFired>,
    engine: Arc<LifecycleEngine>,
) {
    while let Some(command) = fired.recv().await {
        match engine.handle_timer(command).await {
            Ok(outcome) => debug!(timer = %command.key, ?outcome, "timer handled"),
            Err(err) => error!(timer = %command.key, error = %err, "timer handling failed"),
        }
    }
    info!("timer dispatcher stopped");
}
