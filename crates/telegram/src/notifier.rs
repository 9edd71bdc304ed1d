use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{info, warn};

use common::{Error, Notifier, Result};

/// Sends alerts to one fixed Telegram chat or channel.
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat_id)?,
            timeout,
        })
    }
}

/// Numeric ids address users and groups, `@name` addresses a public channel.
pub fn parse_recipient(chat_id: &str) -> Result<Recipient> {
    let chat_id = chat_id.trim();
    if let Ok(id) = chat_id.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat_id.len() > 1 && chat_id.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    Err(Error::Config(format!(
        "TG_CHAT_ID must be a numeric chat id or an @channel name, got '{chat_id}'"
    )))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let request = self.bot.send_message(self.recipient.clone(), message);
        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(_)) => {
                info!("Telegram message sent");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Telegram send failed");
                Err(Error::Notification(e.to_string()))
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Telegram send timed out");
                Err(Error::Notification(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Logs alerts instead of sending them. Keeps a copy of everything it was
/// asked to send.
#[derive(Debug, Default)]
pub struct DryRunNotifier {
    sent: Mutex<Vec<String>>,
}

impl DryRunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(text = ?message, "DRY RUN: alert not sent");
        self.sent
            .lock()
            .map_err(|_| Error::Notification("dry-run log poisoned".into()))?
            .push(message.to_string());
        Ok(())
    }
}
