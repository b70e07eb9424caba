//! The table-level storage boundary shared by every backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chainsql_abi::AccountStore;
use chainsql_core::{ConnectorError, PermissionLevel};

use crate::rows::{
    AccountKeyRow, AccountRow, ActionAccountRow, ActionRow, BlockRow, ExecutedTransaction,
    NewAction, TableCounts, TransactionRow,
};

/// Writes and reads the `blocks`, `transactions`, `actions`,
/// `actions_accounts`, `accounts` and `accounts_keys` tables.
///
/// Writes come from a single task; implementations need no cross-writer
/// isolation.
#[async_trait]
pub trait TableStore: AccountStore {
    /// Create every table and index. Idempotent.
    async fn create_tables(&self) -> Result<(), ConnectorError>;

    /// Drop every table. Idempotent.
    async fn drop_tables(&self) -> Result<(), ConnectorError>;

    // ── writes ────────────────────────────────────────────────────────────────

    /// Insert a block, or refresh it if already known. `irreversible` never
    /// goes back from true to false.
    async fn upsert_block(&self, block: &BlockRow) -> Result<(), ConnectorError>;

    /// Flag the transactions of an irreversible block: those recorded with
    /// `block_id`, plus those listed in `ids` that have no block yet (which
    /// are assigned to it). Returns the rows updated.
    async fn mark_transactions_irreversible(
        &self,
        block_id: &str,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<u64, ConnectorError>;

    /// Record an accepted transaction as pending. A later call for the same
    /// id refreshes its reference block and expiration only.
    async fn insert_pending_transaction(&self, tx: &TransactionRow) -> Result<(), ConnectorError>;

    /// Record that a transaction executed: clears `pending` and sets the
    /// action count, creating the row if the metadata was never seen.
    async fn upsert_executed_transaction(
        &self,
        tx: &ExecutedTransaction,
    ) -> Result<(), ConnectorError>;

    /// Insert an action row and return its assigned id.
    async fn insert_action(&self, action: &NewAction) -> Result<i64, ConnectorError>;

    async fn insert_action_account(
        &self,
        action_id: i64,
        auth: &PermissionLevel,
    ) -> Result<(), ConnectorError>;

    // ── reads ─────────────────────────────────────────────────────────────────

    async fn block(&self, block_id: &str) -> Result<Option<BlockRow>, ConnectorError>;

    /// The preferred block at `block_num`: irreversible first, then the most
    /// recently updated.
    async fn block_by_num(&self, block_num: u32) -> Result<Option<BlockRow>, ConnectorError>;

    async fn transaction(&self, id: &str) -> Result<Option<TransactionRow>, ConnectorError>;

    /// Actions of a transaction in `seq` order.
    async fn actions_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<ActionRow>, ConnectorError>;

    async fn action_accounts(&self, action_id: i64)
        -> Result<Vec<ActionAccountRow>, ConnectorError>;

    async fn account(&self, name: &str) -> Result<Option<AccountRow>, ConnectorError>;

    async fn account_keys(&self, account: &str) -> Result<Vec<AccountKeyRow>, ConnectorError>;

    async fn counts(&self) -> Result<TableCounts, ConnectorError>;
}
