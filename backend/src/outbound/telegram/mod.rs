//! Telegram Bot API adapter for the notification port.

mod dto;
mod http_notifier;

pub use http_notifier::{DEFAULT_TELEGRAM_API_BASE, TelegramNotifier, TelegramNotifierConfig};
