//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod notification_port;
mod record_store;
mod subscription_commands;
mod timer_registry;

#[cfg(test)]
pub use notification_port::MockNotificationPort;
pub use notification_port::{InviteLink, InviteLinkRequest, NotificationError, NotificationPort};
#[cfg(test)]
pub use record_store::MockRecordStore;
pub use record_store::{RecordStore, RecordStoreError};
#[cfg(test)]
pub use subscription_commands::MockSubscriptionCommands;
pub use subscription_commands::SubscriptionCommands;
#[cfg(test)]
pub use timer_registry::MockTimerRegistry;
pub use timer_registry::{TimerRegistry, TimerRegistryError};
