use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The record collections the business tools operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Clients,
    Projects,
    Payments,
    Invoices,
    Expenses,
    Retainers,
    ClientSources,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Projects => "projects",
            Collection::Payments => "payments",
            Collection::Invoices => "invoices",
            Collection::Expenses => "expenses",
            Collection::Retainers => "retainers",
            Collection::ClientSources => "client_sources",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clients" => Ok(Collection::Clients),
            "projects" => Ok(Collection::Projects),
            "payments" => Ok(Collection::Payments),
            "invoices" => Ok(Collection::Invoices),
            "expenses" => Ok(Collection::Expenses),
            "retainers" => Ok(Collection::Retainers),
            "client_sources" => Ok(Collection::ClientSources),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection: Collection,
    pub account_id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// The document with its `id` folded in, as handed to the model.
    pub fn to_json(&self) -> Value {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("id".into(), Value::String(self.id.clone()));
        }
        data
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn num_field(&self, field: &str) -> Option<f64> {
        crate::filter::as_number(self.data.get(field)?)
    }
}
