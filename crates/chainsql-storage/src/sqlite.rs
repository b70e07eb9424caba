//! SQLite storage backend.
//!
//! Persists the chain tables to a single SQLite file via `sqlx`. The derived
//! action columns are `GENERATED ALWAYS ... VIRTUAL`, so SQLite recomputes
//! them from `data` and they can never be written directly.
//!
//! # Usage
//! ```rust,no_run
//! use chainsql_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./chainsql.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use chainsql_abi::{AbiDef, AccountStore};
use chainsql_core::{ConnectorError, PermissionLevel};

use crate::derived::{DerivedFields, DERIVED_COLUMNS};
use crate::rows::{
    AccountKeyRow, AccountRow, ActionAccountRow, ActionRow, BlockRow, ExecutedTransaction,
    NewAction, TableCounts, TransactionRow,
};
use crate::store::TableStore;

fn storage_err(e: sqlx::Error) -> ConnectorError {
    ConnectorError::Storage(e.to_string())
}

const TABLES: [&str; 6] = [
    "actions_accounts",
    "actions",
    "accounts_keys",
    "accounts",
    "transactions",
    "blocks",
];

/// SQLite-backed chain tables.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path` and create the tables.
    ///
    /// The path may be a plain file path (`"./chainsql.db"`) or a full
    /// SQLite URL (`"sqlite:./chainsql.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, ConnectorError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        // WAL mode
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&pool)
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.create_tables().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` is its own database, so the pool
    /// is pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self, ConnectorError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.create_tables().await?;
        Ok(storage)
    }

    async fn exec(&self, sql: &str) -> Result<(), ConnectorError> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn count(&self, table: &str) -> Result<u64, ConnectorError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.get::<i64, _>("cnt") as u64)
    }
}

fn actions_ddl() -> String {
    let derived: String = DERIVED_COLUMNS
        .iter()
        .map(|(column, key)| {
            format!(
                "{column} TEXT GENERATED ALWAYS AS (CAST(json_extract(data, '$.{key}') AS TEXT)) VIRTUAL,\n"
            )
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS actions (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            account        TEXT    NOT NULL DEFAULT '',
            transaction_id TEXT    NOT NULL DEFAULT '',
            seq            INTEGER NOT NULL DEFAULT 0,
            parent         INTEGER NOT NULL DEFAULT 0,
            name           TEXT    NOT NULL DEFAULT '',
            created_at     TEXT    NOT NULL,
            data           TEXT    NOT NULL DEFAULT '{{}}',
            {derived}            CHECK (json_valid(data))
        );"
    )
}

// ─── Row mapping ─────────────────────────────────────────────────────────────

fn block_row(r: &SqliteRow) -> BlockRow {
    BlockRow {
        block_id: r.get("block_id"),
        block_num: r.get::<i64, _>("block_num") as u32,
        prev_block_id: r.get("prev_block_id"),
        timestamp: r.get("timestamp"),
        transaction_mroot: r.get("transaction_mroot"),
        action_mroot: r.get("action_mroot"),
        producer: r.get("producer"),
        schedule_version: r.get::<i64, _>("schedule_version") as u32,
        confirmed: r.get::<i64, _>("confirmed") as u16,
        num_transactions: r.get::<i64, _>("num_transactions") as u32,
        irreversible: r.get("irreversible"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn transaction_row(r: &SqliteRow) -> TransactionRow {
    TransactionRow {
        id: r.get("id"),
        block_id: r.get("block_id"),
        ref_block_num: r.get::<i64, _>("ref_block_num") as u16,
        ref_block_prefix: r.get::<i64, _>("ref_block_prefix") as u32,
        expiration: r.get("expiration"),
        pending: r.get("pending"),
        num_actions: r.get::<i64, _>("num_actions") as u32,
        irreversible: r.get("irreversible"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn action_row(r: &SqliteRow) -> ActionRow {
    let data: String = r.get("data");
    ActionRow {
        id: r.get("id"),
        account: r.get("account"),
        transaction_id: r.get("transaction_id"),
        seq: r.get::<i64, _>("seq") as u32,
        parent: r.get("parent"),
        name: r.get("name"),
        created_at: r.get("created_at"),
        data: serde_json::from_str(&data).unwrap_or(serde_json::Value::Null),
        derived: DerivedFields {
            eosto: r.get("eosto"),
            eosfrom: r.get("eosfrom"),
            receiver: r.get("receiver"),
            payer: r.get("payer"),
            newaccount: r.get("newaccount"),
        },
    }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for SqliteStorage {
    async fn get_abi(&self, account: &str) -> Result<Option<AbiDef>, ConnectorError> {
        let row = sqlx::query("SELECT abi FROM accounts WHERE name = ?")
            .bind(account)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match row.and_then(|r| r.get::<Option<String>, _>("abi")) {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set_abi(&self, account: &str, abi: &AbiDef) -> Result<(), ConnectorError> {
        let text = serde_json::to_string(abi)?;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO accounts (name, abi, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET abi = excluded.abi, updated_at = excluded.updated_at",
        )
        .bind(account)
        .bind(&text)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(account, "abi stored");
        Ok(())
    }

    async fn create_account(&self, name: &str) -> Result<(), ConnectorError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT OR IGNORE INTO accounts (name, abi, created_at, updated_at)
             VALUES (?, NULL, ?, ?)",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn add_account_key(
        &self,
        account: &str,
        public_key: &str,
        permission: &str,
    ) -> Result<(), ConnectorError> {
        sqlx::query(
            "INSERT OR IGNORE INTO accounts_keys (account, public_key, permission)
             VALUES (?, ?, ?)",
        )
        .bind(account)
        .bind(public_key)
        .bind(permission)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

// ─── TableStore impl ─────────────────────────────────────────────────────────

#[async_trait]
impl TableStore for SqliteStorage {
    async fn create_tables(&self) -> Result<(), ConnectorError> {
        self.exec(
            "CREATE TABLE IF NOT EXISTS blocks (
                block_id          TEXT    PRIMARY KEY,
                block_num         INTEGER NOT NULL,
                prev_block_id     TEXT    NOT NULL DEFAULT '',
                timestamp         TEXT    NOT NULL,
                transaction_mroot TEXT    NOT NULL DEFAULT '',
                action_mroot      TEXT    NOT NULL DEFAULT '',
                producer          TEXT    NOT NULL DEFAULT '',
                schedule_version  INTEGER NOT NULL DEFAULT 0,
                confirmed         INTEGER NOT NULL DEFAULT 0,
                num_transactions  INTEGER NOT NULL DEFAULT 0,
                irreversible      INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT    NOT NULL,
                updated_at        TEXT    NOT NULL
            );",
        )
        .await?;

        self.exec(
            "CREATE TABLE IF NOT EXISTS transactions (
                id               TEXT    PRIMARY KEY,
                block_id         TEXT,
                ref_block_num    INTEGER NOT NULL DEFAULT 0,
                ref_block_prefix INTEGER NOT NULL DEFAULT 0,
                expiration       TEXT,
                pending          INTEGER NOT NULL DEFAULT 1,
                num_actions      INTEGER NOT NULL DEFAULT 0,
                irreversible     INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT    NOT NULL,
                updated_at       TEXT    NOT NULL
            );",
        )
        .await?;

        self.exec(&actions_ddl()).await?;

        self.exec(
            "CREATE TABLE IF NOT EXISTS actions_accounts (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                action_id  INTEGER NOT NULL,
                actor      TEXT    NOT NULL DEFAULT '',
                permission TEXT    NOT NULL DEFAULT ''
            );",
        )
        .await?;

        self.exec(
            "CREATE TABLE IF NOT EXISTS accounts (
                name       TEXT PRIMARY KEY,
                abi        TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .await?;

        self.exec(
            "CREATE TABLE IF NOT EXISTS accounts_keys (
                account    TEXT NOT NULL,
                public_key TEXT NOT NULL,
                permission TEXT NOT NULL,
                UNIQUE (account, public_key, permission)
            );",
        )
        .await?;

        // Indexes for common query patterns
        for sql in [
            "CREATE INDEX IF NOT EXISTS idx_blocks_num ON blocks (block_num);",
            "CREATE INDEX IF NOT EXISTS idx_transactions_block ON transactions (block_id);",
            "CREATE INDEX IF NOT EXISTS idx_actions_account ON actions (account);",
            "CREATE INDEX IF NOT EXISTS idx_actions_tx_id ON actions (transaction_id);",
            "CREATE INDEX IF NOT EXISTS idx_actions_created ON actions (created_at);",
            "CREATE INDEX IF NOT EXISTS idx_actions_accounts_actor ON actions_accounts (actor);",
            "CREATE INDEX IF NOT EXISTS idx_actions_accounts_action ON actions_accounts (action_id);",
        ] {
            self.exec(sql).await?;
        }
        for (column, _) in DERIVED_COLUMNS {
            self.exec(&format!(
                "CREATE INDEX IF NOT EXISTS idx_actions_{column} ON actions ({column});"
            ))
            .await?;
        }

        debug!("tables ready");
        Ok(())
    }

    async fn drop_tables(&self) -> Result<(), ConnectorError> {
        for table in TABLES {
            self.exec(&format!("DROP TABLE IF EXISTS {table};")).await?;
        }
        debug!("tables dropped");
        Ok(())
    }

    async fn upsert_block(&self, block: &BlockRow) -> Result<(), ConnectorError> {
        sqlx::query(
            "INSERT INTO blocks (block_id, block_num, prev_block_id, timestamp, transaction_mroot,
                action_mroot, producer, schedule_version, confirmed, num_transactions,
                irreversible, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(block_id) DO UPDATE SET
                irreversible = MAX(blocks.irreversible, excluded.irreversible),
                updated_at   = excluded.updated_at",
        )
        .bind(&block.block_id)
        .bind(block.block_num as i64)
        .bind(&block.prev_block_id)
        .bind(block.timestamp)
        .bind(&block.transaction_mroot)
        .bind(&block.action_mroot)
        .bind(&block.producer)
        .bind(block.schedule_version as i64)
        .bind(block.confirmed as i64)
        .bind(block.num_transactions as i64)
        .bind(block.irreversible)
        .bind(block.created_at)
        .bind(block.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(block = block.block_num, irreversible = block.irreversible, "block stored");
        Ok(())
    }

    async fn mark_transactions_irreversible(
        &self,
        block_id: &str,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<u64, ConnectorError> {
        let mut updated = sqlx::query(
            "UPDATE transactions SET irreversible = 1, updated_at = ? WHERE block_id = ?",
        )
        .bind(at)
        .bind(block_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?
        .rows_affected();

        for id in ids {
            updated += sqlx::query(
                "UPDATE transactions SET irreversible = 1, block_id = ?, updated_at = ?
                 WHERE id = ? AND block_id IS NULL",
            )
            .bind(block_id)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?
            .rows_affected();
        }
        Ok(updated)
    }

    async fn insert_pending_transaction(&self, tx: &TransactionRow) -> Result<(), ConnectorError> {
        sqlx::query(
            "INSERT INTO transactions (id, block_id, ref_block_num, ref_block_prefix, expiration,
                pending, num_actions, irreversible, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                ref_block_num    = excluded.ref_block_num,
                ref_block_prefix = excluded.ref_block_prefix,
                expiration       = excluded.expiration,
                updated_at       = excluded.updated_at",
        )
        .bind(&tx.id)
        .bind(&tx.block_id)
        .bind(tx.ref_block_num as i64)
        .bind(tx.ref_block_prefix as i64)
        .bind(tx.expiration)
        .bind(tx.pending)
        .bind(tx.num_actions as i64)
        .bind(tx.irreversible)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_executed_transaction(
        &self,
        tx: &ExecutedTransaction,
    ) -> Result<(), ConnectorError> {
        sqlx::query(
            "INSERT INTO transactions (id, block_id, pending, num_actions, created_at, updated_at)
             VALUES (?, ?, 0, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                block_id    = COALESCE(excluded.block_id, transactions.block_id),
                pending     = 0,
                num_actions = excluded.num_actions,
                updated_at  = excluded.updated_at",
        )
        .bind(&tx.id)
        .bind(&tx.block_id)
        .bind(tx.num_actions as i64)
        .bind(tx.at)
        .bind(tx.at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_action(&self, action: &NewAction) -> Result<i64, ConnectorError> {
        let data = serde_json::to_string(&action.data)?;
        let result = sqlx::query(
            "INSERT INTO actions (account, transaction_id, seq, parent, name, created_at, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&action.account)
        .bind(&action.transaction_id)
        .bind(action.seq as i64)
        .bind(action.parent)
        .bind(&action.name)
        .bind(action.created_at)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_action_account(
        &self,
        action_id: i64,
        auth: &PermissionLevel,
    ) -> Result<(), ConnectorError> {
        sqlx::query("INSERT INTO actions_accounts (action_id, actor, permission) VALUES (?, ?, ?)")
            .bind(action_id)
            .bind(&auth.actor)
            .bind(&auth.permission)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn block(&self, block_id: &str) -> Result<Option<BlockRow>, ConnectorError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE block_id = ?")
            .bind(block_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.as_ref().map(block_row))
    }

    async fn block_by_num(&self, block_num: u32) -> Result<Option<BlockRow>, ConnectorError> {
        let row = sqlx::query(
            "SELECT * FROM blocks WHERE block_num = ?
             ORDER BY irreversible DESC, updated_at DESC LIMIT 1",
        )
        .bind(block_num as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.as_ref().map(block_row))
    }

    async fn transaction(&self, id: &str) -> Result<Option<TransactionRow>, ConnectorError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.as_ref().map(transaction_row))
    }

    async fn actions_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<ActionRow>, ConnectorError> {
        let rows = sqlx::query(
            "SELECT id, account, transaction_id, seq, parent, name, created_at, data,
                    eosto, eosfrom, receiver, payer, newaccount
             FROM actions WHERE transaction_id = ? ORDER BY seq, id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(rows.iter().map(action_row).collect())
    }

    async fn action_accounts(
        &self,
        action_id: i64,
    ) -> Result<Vec<ActionAccountRow>, ConnectorError> {
        let rows = sqlx::query(
            "SELECT id, action_id, actor, permission FROM actions_accounts
             WHERE action_id = ? ORDER BY id",
        )
        .bind(action_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|r| ActionAccountRow {
                id: r.get("id"),
                action_id: r.get("action_id"),
                actor: r.get("actor"),
                permission: r.get("permission"),
            })
            .collect())
    }

    async fn account(&self, name: &str) -> Result<Option<AccountRow>, ConnectorError> {
        let row = sqlx::query("SELECT name, abi, created_at, updated_at FROM accounts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        let Some(r) = row else {
            return Ok(None);
        };
        let abi = match r.get::<Option<String>, _>("abi") {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        };
        Ok(Some(AccountRow {
            name: r.get("name"),
            abi,
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn account_keys(&self, account: &str) -> Result<Vec<AccountKeyRow>, ConnectorError> {
        let rows = sqlx::query(
            "SELECT account, public_key, permission FROM accounts_keys
             WHERE account = ? ORDER BY rowid",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|r| AccountKeyRow {
                account: r.get("account"),
                public_key: r.get("public_key"),
                permission: r.get("permission"),
            })
            .collect())
    }

    async fn counts(&self) -> Result<TableCounts, ConnectorError> {
        Ok(TableCounts {
            blocks: self.count("blocks").await?,
            transactions: self.count("transactions").await?,
            actions: self.count("actions").await?,
            actions_accounts: self.count("actions_accounts").await?,
            accounts: self.count("accounts").await?,
            accounts_keys: self.count("accounts_keys").await?,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_action(tx: &str, seq: u32, data: serde_json::Value) -> NewAction {
        NewAction {
            account: "eosio.token".into(),
            transaction_id: tx.into(),
            seq,
            parent: 0,
            name: "transfer".into(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            data,
        }
    }

    #[tokio::test]
    async fn create_and_drop_are_idempotent() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.create_tables().await.unwrap();
        store.drop_tables().await.unwrap();
        store.drop_tables().await.unwrap();
        store.create_tables().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn generated_columns_follow_data() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let data = json!({"from": "alice", "to": "bob", "payer": "carol", "name": 5});
        store.insert_action(&new_action("t1", 0, data.clone())).await.unwrap();
        store.insert_action(&new_action("t1", 1, json!({}))).await.unwrap();

        let rows = store.actions_by_transaction("t1").await.unwrap();
        assert_eq!(rows[0].derived, DerivedFields::from_data(&data));
        assert_eq!(rows[0].derived.newaccount.as_deref(), Some("5"));
        assert_eq!(rows[1].derived, DerivedFields::default());
        assert_eq!(rows[0].created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn derived_columns_cannot_be_written() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let res = sqlx::query("INSERT INTO actions (created_at, data, eosto) VALUES ('x', '{}', 'bob')")
            .execute(&store.pool)
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn action_ids_link_authorizations() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let id = store.insert_action(&new_action("t1", 0, json!({}))).await.unwrap();
        store
            .insert_action_account(id, &PermissionLevel::new("alice", "active"))
            .await
            .unwrap();
        store
            .insert_action_account(id, &PermissionLevel::new("alice", "active"))
            .await
            .unwrap();

        let auths = store.action_accounts(id).await.unwrap();
        assert_eq!(auths.len(), 2);
        assert_eq!(auths[0].actor, "alice");
    }

    #[tokio::test]
    async fn block_irreversibility_is_sticky() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let now = Utc::now();
        let mut row = BlockRow {
            block_id: "b1".into(),
            block_num: 1,
            prev_block_id: "b0".into(),
            timestamp: now,
            transaction_mroot: String::new(),
            action_mroot: String::new(),
            producer: "eosio".into(),
            schedule_version: 0,
            confirmed: 0,
            num_transactions: 0,
            irreversible: true,
            created_at: now,
            updated_at: now,
        };
        store.upsert_block(&row).await.unwrap();
        row.irreversible = false;
        store.upsert_block(&row).await.unwrap();

        assert!(store.block("b1").await.unwrap().unwrap().irreversible);
        assert_eq!(store.block_by_num(1).await.unwrap().unwrap().block_id, "b1");
        assert!(store.block_by_num(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_lifecycle() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let now = Utc::now();
        store
            .insert_pending_transaction(&TransactionRow {
                id: "t1".into(),
                block_id: None,
                ref_block_num: 3,
                ref_block_prefix: 4,
                expiration: Some(now),
                pending: true,
                num_actions: 0,
                irreversible: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        assert!(store.transaction("t1").await.unwrap().unwrap().pending);

        store
            .upsert_executed_transaction(&ExecutedTransaction {
                id: "t1".into(),
                block_id: None,
                num_actions: 2,
                at: now,
            })
            .await
            .unwrap();
        let marked = store
            .mark_transactions_irreversible("b9", &["t1".to_string()], now)
            .await
            .unwrap();
        assert_eq!(marked, 1);

        let tx = store.transaction("t1").await.unwrap().unwrap();
        assert!(!tx.pending);
        assert!(tx.irreversible);
        assert_eq!(tx.num_actions, 2);
        assert_eq!(tx.block_id.as_deref(), Some("b9"));
        assert_eq!(tx.ref_block_prefix, 4);
    }

    #[tokio::test]
    async fn abi_is_replaced_not_duplicated() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.create_account("alice").await.unwrap();
        store.create_account("alice").await.unwrap();
        assert!(store.get_abi("alice").await.unwrap().is_none());

        let abi = AbiDef {
            version: "eosio::abi/1.1".into(),
            ..Default::default()
        };
        store.set_abi("alice", &abi).await.unwrap();
        store.set_abi("bob", &abi).await.unwrap();

        assert_eq!(store.get_abi("alice").await.unwrap(), Some(abi.clone()));
        assert_eq!(store.account("bob").await.unwrap().unwrap().abi, Some(abi));
        assert_eq!(store.counts().await.unwrap().accounts, 2);
    }
}
