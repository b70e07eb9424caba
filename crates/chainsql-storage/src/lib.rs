//! chainsql-storage: the relational persistence layer for ChainSQL.
//!
//! [`ChainDatabase`] implements the pipeline's `EventSink` over any
//! [`TableStore`] backend:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - [`sqlite`]: SQLite via `sqlx` (embedded, single-file persistence)

pub mod database;
pub mod derived;
pub mod memory;
pub mod rows;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use database::ChainDatabase;
pub use derived::DerivedFields;
pub use memory::InMemoryStorage;
pub use rows::{
    AccountKeyRow, AccountRow, ActionAccountRow, ActionRow, BlockRow, TableCounts, TransactionRow,
};
pub use store::TableStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
