use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use ledgerforge_core::AccountContext;

use crate::filter::RecordFilter;
use crate::store::{merge_patch, normalize_new, DataStore, StoreError};
use crate::types::{Collection, Record};

type Key = (String, Collection);

/// Volatile store for development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    // (account, collection) -> records in insertion order
    records: RwLock<HashMap<Key, Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(account: &AccountContext, collection: Collection) -> Key {
        (account.account_id().to_string(), collection)
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("in-memory store lock poisoned".into())
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn insert(&self, account: &AccountContext, collection: Collection, data: Value) -> Result<Record, StoreError> {
        let record = Record {
            id: Uuid::new_v4().to_string(),
            collection,
            account_id: account.account_id().to_string(),
            data: normalize_new(data)?,
            created_at: Utc::now(),
        };
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        records.entry(Self::key(account, collection)).or_default().push(record.clone());
        Ok(record)
    }

    async fn get(&self, account: &AccountContext, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records
            .get(&Self::key(account, collection))
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn update(
        &self,
        account: &AccountContext,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Record, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let record = records
            .get_mut(&Self::key(account, collection))
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        merge_patch(&mut record.data, patch)?;
        Ok(record.clone())
    }

    async fn find(
        &self,
        account: &AccountContext,
        collection: Collection,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        let Some(rows) = records.get(&Self::key(account, collection)) else {
            return Ok(Vec::new());
        };
        let matching = rows.iter().rev().filter(|r| filter.matches(&r.data)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
