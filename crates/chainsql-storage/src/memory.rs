//! In-memory storage backend.
//!
//! Keeps every table in RAM with the same semantics as the SQLite backend.
//! Useful for tests and dry runs that don't need persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chainsql_abi::{AbiDef, AccountStore};
use chainsql_core::{ConnectorError, PermissionLevel};

use crate::derived::DerivedFields;
use crate::rows::{
    AccountKeyRow, AccountRow, ActionAccountRow, ActionRow, BlockRow, ExecutedTransaction,
    NewAction, TableCounts, TransactionRow,
};
use crate::store::TableStore;

#[derive(Default)]
struct Tables {
    blocks: HashMap<String, BlockRow>,
    transactions: HashMap<String, TransactionRow>,
    actions: Vec<ActionRow>,
    actions_accounts: Vec<ActionAccountRow>,
    accounts: HashMap<String, AccountRow>,
    accounts_keys: Vec<AccountKeyRow>,
}

/// In-memory chain tables.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, ConnectorError> {
        self.tables
            .lock()
            .map_err(|_| ConnectorError::Storage("memory tables poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for InMemoryStorage {
    async fn get_abi(&self, account: &str) -> Result<Option<AbiDef>, ConnectorError> {
        Ok(self
            .tables()?
            .accounts
            .get(account)
            .and_then(|a| a.abi.clone()))
    }

    async fn set_abi(&self, account: &str, abi: &AbiDef) -> Result<(), ConnectorError> {
        let now = Utc::now();
        let mut t = self.tables()?;
        let row = t.accounts.entry(account.to_string()).or_insert_with(|| AccountRow {
            name: account.to_string(),
            abi: None,
            created_at: now,
            updated_at: now,
        });
        row.abi = Some(abi.clone());
        row.updated_at = now;
        Ok(())
    }

    async fn create_account(&self, name: &str) -> Result<(), ConnectorError> {
        let now = Utc::now();
        self.tables()?
            .accounts
            .entry(name.to_string())
            .or_insert_with(|| AccountRow {
                name: name.to_string(),
                abi: None,
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn add_account_key(
        &self,
        account: &str,
        public_key: &str,
        permission: &str,
    ) -> Result<(), ConnectorError> {
        let row = AccountKeyRow {
            account: account.to_string(),
            public_key: public_key.to_string(),
            permission: permission.to_string(),
        };
        let mut t = self.tables()?;
        if !t.accounts_keys.contains(&row) {
            t.accounts_keys.push(row);
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for InMemoryStorage {
    async fn create_tables(&self) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn drop_tables(&self) -> Result<(), ConnectorError> {
        *self.tables()? = Tables::default();
        Ok(())
    }

    async fn upsert_block(&self, block: &BlockRow) -> Result<(), ConnectorError> {
        let mut t = self.tables()?;
        match t.blocks.get_mut(&block.block_id) {
            Some(existing) => {
                existing.irreversible |= block.irreversible;
                existing.updated_at = block.updated_at;
            }
            None => {
                t.blocks.insert(block.block_id.clone(), block.clone());
            }
        }
        Ok(())
    }

    async fn mark_transactions_irreversible(
        &self,
        block_id: &str,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<u64, ConnectorError> {
        let mut t = self.tables()?;
        let mut updated = 0;
        for tx in t.transactions.values_mut() {
            let unplaced = tx.block_id.is_none() && ids.contains(&tx.id);
            if unplaced || tx.block_id.as_deref() == Some(block_id) {
                if unplaced {
                    tx.block_id = Some(block_id.to_string());
                }
                tx.irreversible = true;
                tx.updated_at = at;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn insert_pending_transaction(&self, tx: &TransactionRow) -> Result<(), ConnectorError> {
        let mut t = self.tables()?;
        match t.transactions.get_mut(&tx.id) {
            Some(existing) => {
                existing.ref_block_num = tx.ref_block_num;
                existing.ref_block_prefix = tx.ref_block_prefix;
                existing.expiration = tx.expiration;
                existing.updated_at = tx.updated_at;
            }
            None => {
                t.transactions.insert(tx.id.clone(), tx.clone());
            }
        }
        Ok(())
    }

    async fn upsert_executed_transaction(
        &self,
        tx: &ExecutedTransaction,
    ) -> Result<(), ConnectorError> {
        let mut t = self.tables()?;
        let row = t
            .transactions
            .entry(tx.id.clone())
            .or_insert_with(|| TransactionRow {
                id: tx.id.clone(),
                block_id: None,
                ref_block_num: 0,
                ref_block_prefix: 0,
                expiration: None,
                pending: true,
                num_actions: 0,
                irreversible: false,
                created_at: tx.at,
                updated_at: tx.at,
            });
        if tx.block_id.is_some() {
            row.block_id = tx.block_id.clone();
        }
        row.pending = false;
        row.num_actions = tx.num_actions;
        row.updated_at = tx.at;
        Ok(())
    }

    async fn insert_action(&self, action: &NewAction) -> Result<i64, ConnectorError> {
        let mut t = self.tables()?;
        let id = t.actions.len() as i64 + 1;
        t.actions.push(ActionRow {
            id,
            account: action.account.clone(),
            transaction_id: action.transaction_id.clone(),
            seq: action.seq,
            parent: action.parent,
            name: action.name.clone(),
            created_at: action.created_at,
            data: action.data.clone(),
            derived: DerivedFields::from_data(&action.data),
        });
        Ok(id)
    }

    async fn insert_action_account(
        &self,
        action_id: i64,
        auth: &PermissionLevel,
    ) -> Result<(), ConnectorError> {
        let mut t = self.tables()?;
        let id = t.actions_accounts.len() as i64 + 1;
        t.actions_accounts.push(ActionAccountRow {
            id,
            action_id,
            actor: auth.actor.clone(),
            permission: auth.permission.clone(),
        });
        Ok(())
    }

    async fn block(&self, block_id: &str) -> Result<Option<BlockRow>, ConnectorError> {
        Ok(self.tables()?.blocks.get(block_id).cloned())
    }

    async fn block_by_num(&self, block_num: u32) -> Result<Option<BlockRow>, ConnectorError> {
        Ok(self
            .tables()?
            .blocks
            .values()
            .filter(|b| b.block_num == block_num)
            .max_by_key(|b| (b.irreversible, b.updated_at))
            .cloned())
    }

    async fn transaction(&self, id: &str) -> Result<Option<TransactionRow>, ConnectorError> {
        Ok(self.tables()?.transactions.get(id).cloned())
    }

    async fn actions_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<ActionRow>, ConnectorError> {
        let mut rows: Vec<_> = self
            .tables()?
            .actions
            .iter()
            .filter(|a| a.transaction_id == transaction_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.seq, a.id));
        Ok(rows)
    }

    async fn action_accounts(
        &self,
        action_id: i64,
    ) -> Result<Vec<ActionAccountRow>, ConnectorError> {
        Ok(self
            .tables()?
            .actions_accounts
            .iter()
            .filter(|a| a.action_id == action_id)
            .cloned()
            .collect())
    }

    async fn account(&self, name: &str) -> Result<Option<AccountRow>, ConnectorError> {
        Ok(self.tables()?.accounts.get(name).cloned())
    }

    async fn account_keys(&self, account: &str) -> Result<Vec<AccountKeyRow>, ConnectorError> {
        Ok(self
            .tables()?
            .accounts_keys
            .iter()
            .filter(|k| k.account == account)
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<TableCounts, ConnectorError> {
        let t = self.tables()?;
        Ok(TableCounts {
            blocks: t.blocks.len() as u64,
            transactions: t.transactions.len() as u64,
            actions: t.actions.len() as u64,
            actions_accounts: t.actions_accounts.len() as u64,
            accounts: t.accounts.len() as u64,
            accounts_keys: t.accounts_keys.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx(id: &str, at: DateTime<Utc>) -> TransactionRow {
        TransactionRow {
            id: id.into(),
            block_id: None,
            ref_block_num: 7,
            ref_block_prefix: 99,
            expiration: Some(at),
            pending: true,
            num_actions: 0,
            irreversible: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn actions_get_increasing_ids_and_derived_fields() {
        let store = InMemoryStorage::new();
        let now = Utc::now();
        let mut action = NewAction {
            account: "eosio.token".into(),
            transaction_id: "t1".into(),
            seq: 1,
            parent: 0,
            name: "transfer".into(),
            created_at: now,
            data: json!({"from": "alice", "to": "bob"}),
        };
        let first = store.insert_action(&action).await.unwrap();
        action.seq = 0;
        action.data = json!({});
        let second = store.insert_action(&action).await.unwrap();
        assert!(second > first);

        let rows = store.actions_by_transaction("t1").await.unwrap();
        assert_eq!(rows[0].seq, 0);
        assert_eq!(rows[1].derived.eosto.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn trace_after_metadata_clears_pending() {
        let store = InMemoryStorage::new();
        let now = Utc::now();
        store.insert_pending_transaction(&tx("t1", now)).await.unwrap();
        store
            .upsert_executed_transaction(&ExecutedTransaction {
                id: "t1".into(),
                block_id: Some("b1".into()),
                num_actions: 2,
                at: now,
            })
            .await
            .unwrap();

        let row = store.transaction("t1").await.unwrap().unwrap();
        assert!(!row.pending);
        assert_eq!(row.num_actions, 2);
        assert_eq!(row.ref_block_num, 7);

        assert_eq!(store.mark_transactions_irreversible("b1", &[], now).await.unwrap(), 1);
        assert!(store.transaction("t1").await.unwrap().unwrap().irreversible);
    }

    #[tokio::test]
    async fn set_abi_replaces_and_keys_are_deduplicated() {
        let store = InMemoryStorage::new();
        store.create_account("alice").await.unwrap();
        assert!(store.get_abi("alice").await.unwrap().is_none());

        let mut abi = AbiDef {
            version: "eosio::abi/1.0".into(),
            ..Default::default()
        };
        store.set_abi("alice", &abi).await.unwrap();
        abi.version = "eosio::abi/1.1".into();
        store.set_abi("alice", &abi).await.unwrap();
        assert_eq!(store.get_abi("alice").await.unwrap().unwrap().version, "eosio::abi/1.1");

        store.add_account_key("alice", "EOS1", "owner").await.unwrap();
        store.add_account_key("alice", "EOS1", "owner").await.unwrap();
        assert_eq!(store.account_keys("alice").await.unwrap().len(), 1);

        store.drop_tables().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), TableCounts::default());
    }
}
