use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use ledgerforge_core::AccountContext;

use crate::filter::{sum_field, RecordFilter};
use crate::types::{Collection, Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: String },

    #[error("record data must be a JSON object")]
    NotAnObject,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Account-scoped access to record collections.
///
/// Every call names the account it acts for; implementations never return or
/// touch rows belonging to another account. Single operations are atomic, but
/// nothing coordinates concurrent callers working on the same record.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a new document and return it with its generated ID.
    async fn insert(&self, account: &AccountContext, collection: Collection, data: Value) -> Result<Record, StoreError>;

    async fn get(&self, account: &AccountContext, collection: Collection, id: &str) -> Result<Option<Record>, StoreError>;

    /// Shallow-merge `patch` into the document. `null` values remove keys.
    async fn update(
        &self,
        account: &AccountContext,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> Result<Record, StoreError>;

    /// Matching records, newest first.
    async fn find(
        &self,
        account: &AccountContext,
        collection: Collection,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, StoreError>;

    /// Sum of a numeric field over matching records; `None` when nothing
    /// contributes (the SQL `SUM` of an empty set).
    async fn sum(
        &self,
        account: &AccountContext,
        collection: Collection,
        field: &str,
        filter: &RecordFilter,
    ) -> Result<Option<f64>, StoreError> {
        let unlimited = RecordFilter {
            limit: None,
            ..filter.clone()
        };
        let records = self.find(account, collection, &unlimited).await?;
        Ok(sum_field(records.iter().map(|r| &r.data), field))
    }
}

/// Apply a shallow merge patch to a stored document.
pub(crate) fn merge_patch(target: &mut Value, patch: Value) -> Result<(), StoreError> {
    let (Value::Object(target), Value::Object(patch)) = (target, patch) else {
        return Err(StoreError::NotAnObject);
    };
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
    Ok(())
}

/// Strip a caller-supplied `id` so stored data never disagrees with the row key.
pub(crate) fn normalize_new(data: Value) -> Result<Value, StoreError> {
    match data {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(Value::Object(map))
        }
        _ => Err(StoreError::NotAnObject),
    }
}
