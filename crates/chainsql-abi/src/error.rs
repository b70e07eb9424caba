//! Error types for ABI handling and binary decoding.

use chainsql_core::ConnectorError;
use thiserror::Error;

/// Errors that can occur while unpacking or decoding binary data.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Action '{0}' is not declared in the ABI")]
    UnknownAction(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Type nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AbiError {
    /// Attach the action this error happened in.
    pub fn in_action(self, account: &str, action: &str) -> ConnectorError {
        ConnectorError::Decode {
            account: account.to_string(),
            action: action.to_string(),
            reason: self.to_string(),
        }
    }
}
