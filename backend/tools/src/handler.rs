//! Typed handler seam and the adapter that registers handlers as [`Tool`]s.
//!
//! Each handler declares the argument shape it accepts. The adapter decodes
//! the model's raw JSON into that shape before any handler logic runs, so a
//! malformed call becomes a failed [`ToolResult`] at the boundary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use ledgerforge_core::{AccountContext, Tool, ToolResult, ToolSpec};
use ledgerforge_store::{DataStore, StoreError};

/// Default cap on name-lookup candidates.
pub const DEFAULT_LOOKUP_LIMIT: usize = 5;

/// Knobs shared by every handler.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    pub lookup_limit: usize,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
        }
    }
}

/// Everything a handler may use for one invocation.
pub struct ToolContext<'a> {
    pub store: &'a dyn DataStore,
    pub account: &'a AccountContext,
    /// Invocation time; all date defaults derive from it.
    pub now: DateTime<Local>,
    pub options: &'a ToolOptions,
}

impl ToolContext<'_> {
    pub fn today(&self) -> chrono::NaiveDate {
        self.now.date_naive()
    }
}

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;

    fn spec() -> ToolSpec;

    async fn handle(&self, args: Self::Args, cx: &ToolContext<'_>) -> ToolResult;
}

/// A handler bound to the store it operates on.
pub struct Registered<H: Handler> {
    handler: H,
    spec: ToolSpec,
    store: Arc<dyn DataStore>,
    options: Arc<ToolOptions>,
}

impl<H: Handler> Registered<H> {
    pub fn new(handler: H, store: Arc<dyn DataStore>, options: Arc<ToolOptions>) -> Self {
        Self {
            handler,
            spec: H::spec(),
            store,
            options,
        }
    }

    fn decode(&self, args: Value) -> Result<H::Args, String> {
        // Models send `null`, or a stray scalar, for tools with nothing required.
        let args = match args {
            object @ Value::Object(_) => object,
            Value::Null => Value::Object(Default::default()),
            other if !self.spec.parameters.iter().any(|p| p.required) => {
                debug!(tool = %self.spec.name, args = %other, "Ignoring non-object arguments");
                Value::Object(Default::default())
            }
            other => other,
        };
        serde_json::from_value(args).map_err(|e| format!("Invalid arguments for {}: {}", self.spec.name, e))
    }
}

#[async_trait]
impl<H: Handler> Tool for Registered<H> {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, args: Value, account: &AccountContext) -> ToolResult {
        let args = match self.decode(args) {
            Ok(args) => args,
            Err(message) => {
                debug!(tool = %self.spec.name, error = %message, "Rejected tool arguments");
                return ToolResult::failure(message);
            }
        };
        let cx = ToolContext {
            store: self.store.as_ref(),
            account,
            now: Local::now(),
            options: &self.options,
        };
        self.handler.handle(args, &cx).await
    }
}

/// Convert a store error into the failure envelope for `action`.
pub fn store_failure(action: &str, err: StoreError) -> ToolResult {
    warn!(action = %action, error = %err, "Data store operation failed");
    ToolResult::failure(format!("Failed to {action}"))
}

/// `Ok(value)` or an early-return failure for the given action.
macro_rules! try_store {
    ($expr:expr, $action:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return $crate::handler::store_failure($action, err),
        }
    };
}
pub(crate) use try_store;

/// Drop `null` members so stored documents only carry supplied fields.
pub fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

/// Two-decimal rounding for currency amounts.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", round2(amount))
}
