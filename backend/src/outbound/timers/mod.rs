//! Tokio-backed timer registry and the single consumer that applies fired
//! timers to the lifecycle engine.

mod dispatcher;
mod registry;

pub use dispatcher::run_timer_dispatcher;
pub use registry::TokioTimerRegistry;
