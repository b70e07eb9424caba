//! The boundary between the ingestion pipeline and the persistence layer.

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::types::{BlockState, TransactionMetadata, TransactionTrace};

/// Receives drained events from the consumer task, one at a time.
///
/// The consumer owns its sink exclusively, so implementations see a single
/// serial write stream. An `Err` only skips the current item.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// A newly produced (still reversible) block.
    async fn consume_block_state(&self, block: &BlockState) -> Result<(), ConnectorError>;

    /// A block that became irreversible.
    async fn consume_irreversible_block_state(
        &self,
        block: &BlockState,
    ) -> Result<(), ConnectorError>;

    /// A transaction accepted by the node, before execution.
    async fn consume_transaction_metadata(
        &self,
        meta: &TransactionMetadata,
    ) -> Result<(), ConnectorError>;

    /// The executed result of a transaction, with its actions.
    async fn consume_transaction_trace(
        &self,
        trace: &TransactionTrace,
    ) -> Result<(), ConnectorError>;
}
