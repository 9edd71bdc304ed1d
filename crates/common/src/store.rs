use async_trait::async_trait;

use crate::{Result, StoredIpoState};

/// Durable table of `StoredIpoState` keyed by IPO name.
///
/// A run reads the whole table once with `get_all` and writes it back once
/// with `replace_all`; the point operations exist for maintenance and tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<StoredIpoState>>;

    async fn get(&self, name: &str) -> Result<Option<StoredIpoState>>;

    /// Insert or overwrite the row with the same name.
    async fn upsert(&self, row: &StoredIpoState) -> Result<()>;

    /// Remove a row. Deleting an absent name is not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Atomically replace the entire table with `rows`. Either every row is
    /// written or the previous contents remain untouched.
    async fn replace_all(&self, rows: &[StoredIpoState]) -> Result<()>;
}
