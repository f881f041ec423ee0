//! SQLite-backed durable record store.
//!
//! Documents are kept as JSON text in a single `records` table keyed by
//! account and collection. The scoped select runs in SQLite; name, equality
//! and date filters are evaluated in Rust on the fetched rows.
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use ledgerforge_core::AccountContext;

use crate::filter::RecordFilter;
use crate::store::{merge_patch, normalize_new, DataStore, StoreError};
use crate::types::{Collection, Record};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
         id          TEXT PRIMARY KEY,
         account_id  TEXT NOT NULL,
         collection  TEXT NOT NULL,
         data_json   TEXT NOT NULL,
         created_at  TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_records_scope ON records(account_id, collection);";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite record database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;
        conn.execute_batch(SCHEMA).context("Failed to initialize records schema")?;

        info!("SqliteStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn insert(&self, account: &AccountContext, collection: Collection, data: Value) -> Result<Record, StoreError> {
        let record = Record {
            id: Uuid::new_v4().to_string(),
            collection,
            account_id: account.account_id().to_string(),
            data: normalize_new(data)?,
            created_at: Utc::now(),
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO records (id, account_id, collection, data_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.account_id,
                collection.as_str(),
                serde_json::to_string(&record.data)?,
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!(collection = %collection, id = %record.id, "Inserted record");
        Ok(record)
    }

    async fn get(&self, account: &AccountContext, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, account_id, collection, data_json, created_at
                 FROM records WHERE id = ?1 AND account_id = ?2 AND collection = ?3",
                params![id, account.account_id(), collection.as_str()],
                row_to_raw,
            )
            .optional()?;
        row.map(RawRow::into_record).transpose()
    }

    async fn update(
        &self,
        account: &AccountContext,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Record, StoreError> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                "SELECT id, account_id, collection, data_json, created_at
                 FROM records WHERE id = ?1 AND account_id = ?2 AND collection = ?3",
                params![id, account.account_id(), collection.as_str()],
                row_to_raw,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let mut record = raw.into_record()?;
        merge_patch(&mut record.data, patch)?;
        conn.execute(
            "UPDATE records SET data_json = ?1 WHERE id = ?2 AND account_id = ?3",
            params![serde_json::to_string(&record.data)?, id, account.account_id()],
        )?;
        debug!(collection = %collection, id = %id, "Updated record");
        Ok(record)
    }

    async fn find(
        &self,
        account: &AccountContext,
        collection: Collection,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, collection, data_json, created_at
             FROM records WHERE account_id = ?1 AND collection = ?2
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows: Vec<RawRow> = stmt
            .query_map(params![account.account_id(), collection.as_str()], row_to_raw)?
            .collect::<rusqlite::Result<_>>()?;

        let mut records = Vec::new();
        for raw in rows {
            let record = raw.into_record()?;
            if filter.matches(&record.data) {
                records.push(record);
                if filter.limit.is_some_and(|limit| records.len() >= limit) {
                    break;
                }
            }
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Row deserialization helper
// ---------------------------------------------------------------------------

struct RawRow {
    id: String,
    account_id: String,
    collection: String,
    data_json: String,
    created_at: String,
}

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        collection: row.get(2)?,
        data_json: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl RawRow {
    fn into_record(self) -> Result<Record, StoreError> {
        let collection = self.collection.parse().map_err(StoreError::Backend)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Record {
            id: self.id,
            collection,
            account_id: self.account_id,
            data: serde_json::from_str(&self.data_json)?,
            created_at,
        })
    }
}
