//! Where ABIs and created accounts live.
//!
//! Implemented by the persistence layer over its `accounts` and
//! `accounts_keys` tables.

use async_trait::async_trait;
use chainsql_core::ConnectorError;

use crate::abi::AbiDef;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// The account's current ABI, or `None` if it never set one.
    async fn get_abi(&self, account: &str) -> Result<Option<AbiDef>, ConnectorError>;

    /// Write or replace the account's ABI and bump its `updated_at`.
    async fn set_abi(&self, account: &str, abi: &AbiDef) -> Result<(), ConnectorError>;

    /// Record a newly created account with no ABI.
    async fn create_account(&self, name: &str) -> Result<(), ConnectorError>;

    async fn add_account_key(
        &self,
        account: &str,
        public_key: &str,
        permission: &str,
    ) -> Result<(), ConnectorError>;
}
