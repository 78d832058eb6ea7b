//! In-memory adapters and recording doubles shared by unit and integration
//! tests. Compiled for `cfg(test)` and the `test-support` feature.

mod clock;
mod memory_store;
mod recording_notifier;
mod recording_timers;

pub use clock::{MutableClock, RecordingSleeper};
pub use memory_store::InMemoryRecordStore;
pub use recording_notifier::{Notification, RecordingNotifier};
pub use recording_timers::{RecordingTimerRegistry, TimerEvent};
