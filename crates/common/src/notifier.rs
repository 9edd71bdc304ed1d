use async_trait::async_trait;

use crate::Result;

/// Sink for alert text. Delivery is best-effort: callers log failures and
/// carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}
