//! Chain event model shared by the pipeline, the decoder and the storage layer.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Action ──────────────────────────────────────────────────────────────────

/// An `{actor, permission}` pair authorizing an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

impl PermissionLevel {
    pub fn new(actor: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            permission: permission.into(),
        }
    }
}

/// A single invocation of an account's contract.
///
/// `data` stays opaque until it is decoded against the account's ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Contract account that handles the action (e.g. `"eosio.token"`).
    pub account: String,
    /// Action name (e.g. `"transfer"`).
    pub name: String,
    /// Authorizations in the order the transaction declared them.
    #[serde(default)]
    pub authorization: Vec<PermissionLevel>,
    /// Binary payload, hex-encoded on the wire.
    #[serde(default, with = "hex::serde")]
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(account: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            name: name.into(),
            authorization: vec![],
            data: vec![],
        }
    }

    /// Add an authorization entry.
    pub fn authorized_by(mut self, actor: impl Into<String>, permission: impl Into<String>) -> Self {
        self.authorization.push(PermissionLevel::new(actor, permission));
        self
    }

    /// Set the binary payload.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

// ─── Blocks and transactions ─────────────────────────────────────────────────

/// A produced block as reported by the node.
///
/// Whether the block is final is implied by the queue it arrives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub block_num: u32,
    pub block_id: String,
    /// Id of the parent block.
    pub previous: String,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: i64,
    pub producer: String,
    #[serde(default)]
    pub transaction_mroot: String,
    #[serde(default)]
    pub action_mroot: String,
    #[serde(default)]
    pub schedule_version: u32,
    #[serde(default)]
    pub confirmed: u16,
    /// Ids of the transactions included in the block.
    #[serde(default)]
    pub transactions: Vec<String>,
}

/// A transaction as accepted by the node, before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub id: String,
    /// Unix timestamp after which the transaction is invalid.
    pub expiration: i64,
    #[serde(default)]
    pub ref_block_num: u16,
    #[serde(default)]
    pub ref_block_prefix: u32,
    #[serde(default)]
    pub signatures: Vec<String>,
}

/// The executed result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub id: String,
    pub block_num: u32,
    /// Id of the including block, when the node reports it.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Unix timestamp of the including block (seconds since epoch).
    pub block_time: i64,
    /// Executed actions; the position in this list is the action's `seq`.
    #[serde(default)]
    pub actions: Vec<Action>,
}

// ─── Event kinds ─────────────────────────────────────────────────────────────

/// The four event kinds, in the order the consumer drains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Block,
    IrreversibleBlock,
    TransactionMetadata,
    TransactionTrace,
}

impl EventKind {
    /// Every kind, in drain order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Block,
        EventKind::IrreversibleBlock,
        EventKind::TransactionMetadata,
        EventKind::TransactionTrace,
    ];

    /// Position of this kind in drain order.
    pub fn index(self) -> usize {
        match self {
            Self::Block => 0,
            Self::IrreversibleBlock => 1,
            Self::TransactionMetadata => 2,
            Self::TransactionTrace => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::IrreversibleBlock => write!(f, "irreversible_block"),
            Self::TransactionMetadata => write!(f, "transaction_metadata"),
            Self::TransactionTrace => write!(f, "transaction_trace"),
        }
    }
}

/// A tagged node event, as captured to a JSON-lines replay file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainEvent {
    Block(BlockState),
    IrreversibleBlock(BlockState),
    TransactionMetadata(TransactionMetadata),
    TransactionTrace(TransactionTrace),
}

impl ChainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Block(_) => EventKind::Block,
            Self::IrreversibleBlock(_) => EventKind::IrreversibleBlock,
            Self::TransactionMetadata(_) => EventKind::TransactionMetadata,
            Self::TransactionTrace(_) => EventKind::TransactionTrace,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
