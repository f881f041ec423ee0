//! Record storage behind the business tools.
//!
//! Records are JSON documents grouped into named collections and always
//! addressed through an [`AccountContext`](ledgerforge_core::AccountContext).

pub mod filter;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;
pub mod types;

pub use filter::{DateRange, RecordFilter};
pub use memory_store::InMemoryStore;
pub use sqlite_store::SqliteStore;
pub use store::{DataStore, StoreError};
pub use types::{Collection, Record};
