//! Row types for the six tables, as written and as read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chainsql_abi::AbiDef;
use chainsql_core::{BlockState, ConnectorError};

use crate::derived::DerivedFields;

/// Convert epoch seconds into a stored datetime.
pub fn to_datetime(secs: i64) -> Result<DateTime<Utc>, ConnectorError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ConnectorError::Other(format!("timestamp {secs} out of range")))
}

/// `blocks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRow {
    pub block_id: String,
    pub block_num: u32,
    pub prev_block_id: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_mroot: String,
    pub action_mroot: String,
    pub producer: String,
    pub schedule_version: u32,
    pub confirmed: u16,
    pub num_transactions: u32,
    pub irreversible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockRow {
    pub fn from_block(
        block: &BlockState,
        irreversible: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            block_id: block.block_id.clone(),
            block_num: block.block_num,
            prev_block_id: block.previous.clone(),
            timestamp: to_datetime(block.timestamp)?,
            transaction_mroot: block.transaction_mroot.clone(),
            action_mroot: block.action_mroot.clone(),
            producer: block.producer.clone(),
            schedule_version: block.schedule_version,
            confirmed: block.confirmed,
            num_transactions: block.transactions.len() as u32,
            irreversible,
            created_at: now,
            updated_at: now,
        })
    }
}

/// `transactions`
///
/// A row may be created by either the metadata (pending, with expiration
/// and reference block) or the trace (executed, with block and action
/// count), whichever arrives first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: String,
    pub block_id: Option<String>,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: Option<DateTime<Utc>>,
    pub pending: bool,
    pub num_actions: u32,
    pub irreversible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a trace contributes to its transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedTransaction {
    pub id: String,
    pub block_id: Option<String>,
    pub num_actions: u32,
    pub at: DateTime<Utc>,
}

/// An `actions` row before insertion; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub account: String,
    pub transaction_id: String,
    pub seq: u32,
    pub parent: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
}

/// `actions`, with the derived columns as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    pub id: i64,
    pub account: String,
    pub transaction_id: String,
    pub seq: u32,
    pub parent: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
    #[serde(flatten)]
    pub derived: DerivedFields,
}

/// `actions_accounts`: one authorization of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionAccountRow {
    pub id: i64,
    pub action_id: i64,
    pub actor: String,
    pub permission: String,
}

/// `accounts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub name: String,
    pub abi: Option<AbiDef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `accounts_keys`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountKeyRow {
    pub account: String,
    pub public_key: String,
    pub permission: String,
}

/// Row count per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub blocks: u64,
    pub transactions: u64,
    pub actions: u64,
    pub actions_accounts: u64,
    pub accounts: u64,
    pub accounts_keys: u64,
}
