//! Long-running tasks started next to the HTTP server.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::TimerFired;
use crate::domain::lifecycle::{DailySweepScheduler, LifecycleEngine, TokioSleeper};
use crate::outbound::timers::run_timer_dispatcher;

/// Handles for the timer dispatcher and the daily sweep.
pub struct BackgroundTasks {
    dispatcher: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Start the dispatcher, re-arm timers lost to the last shutdown, then
    /// start the daily sweep.
    ///
    /// A failed rehydration is logged; the first sweep catches up instead.
    pub async fn start(
        engine: Arc<LifecycleEngine>,
        fired: mpsc::UnboundedReceiver<TimerFired>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = tokio::spawn(run_timer_dispatcher(fired, Arc::clone(&engine)));
        if let Err(err) = engine.rehydrate_timers().await {
            warn!(error = %err, "timer rehydration failed; relying on the daily sweep");
        }
        let scheduler = DailySweepScheduler::new(engine, clock, Arc::new(TokioSleeper));
        let sweep = tokio::spawn(scheduler.run());
        info!("background tasks started");
        Self { dispatcher, sweep }
    }

    /// Stop both tasks. Pending timers are dropped with the dispatcher and
    /// rehydrated on the next start.
    pub fn shutdown(self) {
        self.sweep.abort();
        self.dispatcher.abort();
        info!("background tasks stopped");
    }
}
