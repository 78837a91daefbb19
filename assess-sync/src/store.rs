//! Local SQLite store for offline-first operations
//!
//! Provides:
//! - One durable table per collection, keyed by the entity identifier
//! - Per-record sync status tracking and status-filtered queries
//! - A small key-value metadata table for engine state
//!
//! The store is the only shared mutable resource in the engine; every write
//! is a record-level replace-or-insert, so no cross-record transactions are
//! needed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{Collection, LocalRecord, SyncStatus};

/// Outcome of an upsert: whether the id already existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Local database handle
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (or create) the local database and initialize its schema.
    pub async fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        // WAL keeps readers unblocked while the orchestrator writes
        if config.enable_wal {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
        }

        let store = Self { pool };
        store.initialize_schema().await?;

        tracing::debug!(db_path = %config.db_path, "local store opened");

        Ok(store)
    }

    /// Create collection tables and indexes, idempotently.
    async fn initialize_schema(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            let table = collection.table_name();
            let create = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    sync_status TEXT NOT NULL,
                    last_synced_at TEXT NOT NULL
                )
                "#
            );
            sqlx::query(&create).execute(&self.pool).await?;

            let index = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table}(sync_status)"
            );
            sqlx::query(&index).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All records in a collection; empty vec if none exist.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<LocalRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT id, payload, sync_status, last_synced_at FROM {} ORDER BY id",
            collection.table_name()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| Self::decode_row(collection, &row))
            .collect()
    }

    pub async fn get_by_id<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<LocalRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT id, payload, sync_status, last_synced_at FROM {} WHERE id = ?",
            collection.table_name()
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.map(|row| Self::decode_row(collection, &row)).transpose()
    }

    /// Replace-or-insert by id. Applying the same record twice yields the
    /// same stored state.
    pub async fn upsert<T: Serialize>(
        &self,
        collection: Collection,
        record: &LocalRecord<T>,
    ) -> Result<Upsert, StoreError> {
        let existed = self.exists(collection, &record.id).await?;
        let payload = serde_json::to_string(&record.payload)?;

        let sql = format!(
            r#"
            INSERT INTO {table} (id, payload, sync_status, last_synced_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                sync_status = excluded.sync_status,
                last_synced_at = excluded.last_synced_at
            "#,
            table = collection.table_name()
        );
        sqlx::query(&sql)
            .bind(&record.id)
            .bind(payload)
            .bind(record.sync_status.as_str())
            .bind(record.last_synced_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(if existed {
            Upsert::Replaced
        } else {
            Upsert::Inserted
        })
    }

    /// Records in a collection carrying the given sync status.
    pub async fn query_by_status<T: DeserializeOwned>(
        &self,
        collection: Collection,
        status: SyncStatus,
    ) -> Result<Vec<LocalRecord<T>>, StoreError> {
        let sql = format!(
            "SELECT id, payload, sync_status, last_synced_at FROM {} WHERE sync_status = ? ORDER BY id",
            collection.table_name()
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Self::decode_row(collection, &row))
            .collect()
    }

    pub async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", collection.table_name());
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    /// Store a metadata value, replacing any previous one.
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM sync_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get("value").map_err(StoreError::from))
            .transpose()
    }

    /// Close the underlying pool.
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn exists(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?", collection.table_name());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    fn decode_row<T: DeserializeOwned>(
        collection: Collection,
        row: &SqliteRow,
    ) -> Result<LocalRecord<T>, StoreError> {
        let id: String = row.try_get("id")?;
        let payload: String = row.try_get("payload")?;
        let sync_status: String = row.try_get("sync_status")?;
        let last_synced_at: String = row.try_get("last_synced_at")?;

        Ok(LocalRecord {
            payload: serde_json::from_str(&payload)?,
            sync_status: SyncStatus::from_str(&sync_status)?,
            last_synced_at: DateTime::parse_from_rfc3339(&last_synced_at)
                .map_err(|e| StoreError::CorruptRecord {
                    collection: collection.to_string(),
                    detail: format!("bad timestamp for {id}: {e}"),
                })?
                .with_timezone(&Utc),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Question};
    use tempfile::NamedTempFile;

    async fn create_test_store() -> (LocalStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let config = StoreConfig {
            db_path: temp_file.path().to_str().unwrap().to_string(),
            ..StoreConfig::default()
        };
        (LocalStore::new(config).await.unwrap(), temp_file)
    }

    fn question_record(id: &str, text: &str) -> LocalRecord<Question> {
        LocalRecord {
            id: id.to_string(),
            payload: Question {
                id: id.to_string(),
                category_id: Some("c1".to_string()),
                text: text.to_string(),
                weight: Some(1.0),
            },
            sync_status: SyncStatus::Synced,
            last_synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_store_reads() {
        let (store, _file) = create_test_store().await;

        let all: Vec<LocalRecord<Question>> = store.get_all(Collection::Questions).await.unwrap();
        assert!(all.is_empty());
        assert_eq!(store.count(Collection::Questions).await.unwrap(), 0);

        let absent: Option<LocalRecord<Question>> = store
            .get_by_id(Collection::Questions, "nope")
            .await
            .unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (store, _file) = create_test_store().await;
        let record = question_record("q1", "How documented is the process?");

        let first = store.upsert(Collection::Questions, &record).await.unwrap();
        assert_eq!(first, Upsert::Inserted);

        let second = store.upsert(Collection::Questions, &record).await.unwrap();
        assert_eq!(second, Upsert::Replaced);

        let all: Vec<LocalRecord<Question>> = store.get_all(Collection::Questions).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload, record.payload);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let (store, _file) = create_test_store().await;

        store
            .upsert(Collection::Questions, &question_record("q1", "old text"))
            .await
            .unwrap();
        store
            .upsert(Collection::Questions, &question_record("q1", "new text"))
            .await
            .unwrap();

        let stored: LocalRecord<Question> = store
            .get_by_id(Collection::Questions, "q1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload.text, "new text");
        assert_eq!(store.count(Collection::Questions).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let (store, _file) = create_test_store().await;

        store
            .upsert(Collection::Questions, &question_record("x1", "a question"))
            .await
            .unwrap();

        let categories: Vec<LocalRecord<Category>> =
            store.get_all(Collection::Categories).await.unwrap();
        assert!(categories.is_empty());
        assert_eq!(store.count(Collection::Questions).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_by_status() {
        let (store, _file) = create_test_store().await;

        let mut pending = question_record("q1", "pending one");
        pending.sync_status = SyncStatus::Pending;
        store.upsert(Collection::Questions, &pending).await.unwrap();
        store
            .upsert(Collection::Questions, &question_record("q2", "synced one"))
            .await
            .unwrap();

        let found: Vec<LocalRecord<Question>> = store
            .query_by_status(Collection::Questions, SyncStatus::Pending)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "q1");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = StoreConfig {
            db_path: temp_file.path().to_str().unwrap().to_string(),
            ..StoreConfig::default()
        };

        let store = LocalStore::new(config.clone()).await.unwrap();
        store
            .upsert(Collection::Questions, &question_record("q1", "durable"))
            .await
            .unwrap();
        store.close().await;

        let reopened = LocalStore::new(config).await.unwrap();
        let stored: LocalRecord<Question> = reopened
            .get_by_id(Collection::Questions, "q1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload.text, "durable");
    }

    #[tokio::test]
    async fn test_metadata_roundtrip() {
        let (store, _file) = create_test_store().await;

        assert!(store.get_meta("last_full_sync_at").await.unwrap().is_none());

        store.set_meta("last_full_sync_at", "2026-01-01T00:00:00Z").await.unwrap();
        store.set_meta("last_full_sync_at", "2026-02-01T00:00:00Z").await.unwrap();

        assert_eq!(
            store.get_meta("last_full_sync_at").await.unwrap().as_deref(),
            Some("2026-02-01T00:00:00Z")
        );
    }
}
