use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{RecordStore, Result, StoredIpoState};

/// In-process store. Backs dry runs and tests; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, StoredIpoState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = StoredIpoState>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().map(|r| (r.name.clone(), r)).collect()),
        }
    }

    /// Scratch copy of another store's current table. Writes to the copy
    /// never reach `source`.
    pub async fn snapshot_of(source: &dyn RecordStore) -> Result<Self> {
        Ok(Self::with_rows(source.get_all().await?))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<StoredIpoState>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<Option<StoredIpoState>> {
        Ok(self.rows.read().await.get(name).cloned())
    }

    async fn upsert(&self, row: &StoredIpoState) -> Result<()> {
        self.rows.write().await.insert(row.name.clone(), row.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.rows.write().await.remove(name);
        Ok(())
    }

    async fn replace_all(&self, rows: &[StoredIpoState]) -> Result<()> {
        let fresh = rows.iter().map(|r| (r.name.clone(), r.clone())).collect();
        *self.rows.write().await = fresh;
        Ok(())
    }
}
