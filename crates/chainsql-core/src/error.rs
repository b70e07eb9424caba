//! Error types for the chainsql pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting and persisting chain events.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error in {account}::{action}: {reason}")]
    Decode {
        account: String,
        action: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pipeline closed: the consumer is no longer running")]
    PipelineClosed,

    #[error("Pipeline failure: {0}")]
    Pipeline(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ConnectorError {
    /// Returns `true` if the error stops the consumer task (no local recovery).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }
}
