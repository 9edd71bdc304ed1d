pub mod notifier;

pub use notifier::{parse_recipient, DryRunNotifier, TelegramNotifier};
