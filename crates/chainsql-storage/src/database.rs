//! The persistence layer the consumer drains into.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use chainsql_abi::ActionDecoder;
use chainsql_core::{
    Action, BlockState, ConnectorError, EventSink, TransactionMetadata, TransactionTrace,
};

use crate::rows::{to_datetime, BlockRow, ExecutedTransaction, NewAction, TransactionRow};
use crate::store::TableStore;

/// Writes chain events into a [`TableStore`], decoding actions on the way.
pub struct ChainDatabase<T: TableStore> {
    store: Arc<T>,
    decoder: ActionDecoder<T>,
}

impl<T: TableStore> ChainDatabase<T> {
    /// Wrap `store`; the decoder caches one serializer per account.
    pub fn new(store: Arc<T>) -> Self {
        let decoder = ActionDecoder::new(store.clone()).with_cache(true);
        Self { store, decoder }
    }

    /// Re-read the ABI from the store for every action instead of caching.
    pub fn without_abi_cache(mut self) -> Self {
        self.decoder = ActionDecoder::new(self.store.clone());
        self
    }

    pub fn store(&self) -> &Arc<T> {
        &self.store
    }

    /// Create the tables, dropping existing ones first when `wipe` is set.
    pub async fn prepare(&self, wipe: bool) -> Result<(), ConnectorError> {
        if wipe {
            warn!("wiping chain tables");
            self.store.drop_tables().await?;
        }
        self.store.create_tables().await
    }

    /// Persist one action of transaction `transaction_id`.
    ///
    /// The data is decoded first (that never fails), then the action row is
    /// inserted, then one `actions_accounts` row per authorization with the
    /// new action's id. If the action row cannot be written the failure is
    /// logged with the full action and no authorizations are attempted.
    /// Returns the new action id.
    pub async fn add_action(
        &self,
        action: &Action,
        transaction_id: &str,
        timestamp: i64,
        seq: u32,
    ) -> Option<i64> {
        let data = self.decoder.decode(action).await;

        let inserted = match to_datetime(timestamp) {
            Ok(created_at) => {
                let row = NewAction {
                    account: action.account.clone(),
                    transaction_id: transaction_id.to_string(),
                    seq,
                    parent: 0,
                    name: action.name.clone(),
                    created_at,
                    data,
                };
                self.store.insert_action(&row).await
            }
            Err(e) => Err(e),
        };
        let action_id = match inserted {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    account = %action.account,
                    action = %action.name,
                    transaction = transaction_id,
                    error = %e,
                    payload = %serde_json::to_string(action).unwrap_or_default(),
                    "insert action failed"
                );
                return None;
            }
        };

        for auth in &action.authorization {
            if let Err(e) = self.store.insert_action_account(action_id, auth).await {
                warn!(
                    action_id,
                    actor = %auth.actor,
                    permission = %auth.permission,
                    error = %e,
                    "insert action authorization failed"
                );
            }
        }
        Some(action_id)
    }
}

#[async_trait]
impl<T: TableStore + 'static> EventSink for ChainDatabase<T> {
    async fn consume_block_state(&self, block: &BlockState) -> Result<(), ConnectorError> {
        let row = BlockRow::from_block(block, false, Utc::now())?;
        self.store.upsert_block(&row).await
    }

    async fn consume_irreversible_block_state(
        &self,
        block: &BlockState,
    ) -> Result<(), ConnectorError> {
        let now = Utc::now();
        let row = BlockRow::from_block(block, true, now)?;
        self.store.upsert_block(&row).await?;

        let marked = self
            .store
            .mark_transactions_irreversible(&block.block_id, &block.transactions, now)
            .await?;
        debug!(block = block.block_num, transactions = marked, "block irreversible");
        Ok(())
    }

    async fn consume_transaction_metadata(
        &self,
        meta: &TransactionMetadata,
    ) -> Result<(), ConnectorError> {
        let now = Utc::now();
        let row = TransactionRow {
            id: meta.id.clone(),
            block_id: None,
            ref_block_num: meta.ref_block_num,
            ref_block_prefix: meta.ref_block_prefix,
            expiration: Some(to_datetime(meta.expiration)?),
            pending: true,
            num_actions: 0,
            irreversible: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_pending_transaction(&row).await
    }

    async fn consume_transaction_trace(
        &self,
        trace: &TransactionTrace,
    ) -> Result<(), ConnectorError> {
        let block_id = match &trace.block_id {
            Some(id) => Some(id.clone()),
            None => self
                .store
                .block_by_num(trace.block_num)
                .await?
                .map(|b| b.block_id),
        };

        // The transaction row must exist before any of its actions.
        self.store
            .upsert_executed_transaction(&ExecutedTransaction {
                id: trace.id.clone(),
                block_id,
                num_actions: trace.actions.len() as u32,
                at: to_datetime(trace.block_time)?,
            })
            .await?;

        for (seq, action) in trace.actions.iter().enumerate() {
            self.add_action(action, &trace.id, trace.block_time, seq as u32)
                .await;
        }
        debug!(transaction = %trace.id, actions = trace.actions.len(), "trace stored");
        Ok(())
    }
}
