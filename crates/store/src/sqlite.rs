use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{query::Query, Row, Sqlite};
use tracing::{debug, info};

use common::{Error, IpoStatus, RecordStore, Result, StoredIpoState};

use crate::codec::{decode_date, decode_history, encode_date, encode_history};

const UPSERT_SQL: &str = r#"
    INSERT INTO ipo_state (name, gmp_history, start_date, end_date, subscription, status, last_processed)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(name) DO UPDATE SET
        gmp_history    = excluded.gmp_history,
        start_date     = excluded.start_date,
        end_date       = excluded.end_date,
        subscription   = excluded.subscription,
        status         = excluded.status,
        last_processed = excluded.last_processed
"#;

const SELECT_SQL: &str = r#"
    SELECT name, gmp_history, start_date, end_date, subscription, status, last_processed
    FROM ipo_state
"#;

/// SQLite-backed IPO table. Whole-table writes run in one transaction.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        // One connection: a run is sequential, and `sqlite::memory:` gives
        // every connection its own database.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Self::from_pool(db).await
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations")
            .run(&db)
            .await
            .map_err(|e| Error::Store(format!("migration failed: {e}")))?;
        info!("IPO state database ready");
        Ok(Self { db })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<StoredIpoState>> {
        let rows = sqlx::query(&format!("{SELECT_SQL} ORDER BY name"))
            .fetch_all(&self.db)
            .await?;
        let states = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
        debug!(rows = states.len(), "Loaded IPO state");
        Ok(states)
    }

    async fn get(&self, name: &str) -> Result<Option<StoredIpoState>> {
        let row = sqlx::query(&format!("{SELECT_SQL} WHERE name = ?1"))
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn upsert(&self, row: &StoredIpoState) -> Result<()> {
        upsert_query(row)?.execute(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM ipo_state WHERE name = ?1")
            .bind(name)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn replace_all(&self, rows: &[StoredIpoState]) -> Result<()> {
        // Encode everything first so a bad row fails before the transaction opens.
        let queries = rows.iter().map(upsert_query).collect::<Result<Vec<_>>>()?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM ipo_state").execute(&mut *tx).await?;
        for query in queries {
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(rows = rows.len(), "Replaced IPO state table");
        Ok(())
    }
}

fn upsert_query(row: &StoredIpoState) -> Result<Query<'static, Sqlite, SqliteArguments<'static>>> {
    Ok(sqlx::query(UPSERT_SQL)
        .bind(row.name.clone())
        .bind(encode_history(&row.gmp_history)?)
        .bind(row.start_date.map(encode_date))
        .bind(encode_date(row.end_date))
        .bind(row.subscription.clone())
        .bind(row.status.to_string())
        .bind(row.last_processed.map(encode_date)))
}

fn decode_row(row: &SqliteRow) -> Result<StoredIpoState> {
    let name: String = row.try_get("name")?;
    let history: String = row.try_get("gmp_history")?;
    let start_date: Option<String> = row.try_get("start_date")?;
    let end_date: String = row.try_get("end_date")?;
    let status: String = row.try_get("status")?;
    let last_processed: Option<String> = row.try_get("last_processed")?;

    let status = status
        .parse::<IpoStatus>()
        .map_err(|e| Error::Store(format!("row '{name}': {e}")))?;

    Ok(StoredIpoState {
        gmp_history: decode_history(&name, &history),
        start_date: start_date.as_deref().map(|s| decode_date("start_date", s)).transpose()?,
        end_date: decode_date("end_date", &end_date)?,
        subscription: row.try_get("subscription")?,
        status,
        last_processed: last_processed
            .as_deref()
            .map(|s| decode_date("last_processed", s))
            .transpose()?,
        name,
    })
}
