//! chainsql-core: event model and ingestion pipeline for the ChainSQL connector.
//!
//! # Architecture
//!
//! ```text
//! node callbacks ──push_*──► Consumer (4 bounded queues, adaptive backpressure)
//!                                │  swap + ordered drain
//!                                ▼
//!                           EventSink  (chainsql-storage: ChainDatabase)
//!                                ├── blocks / transactions
//!                                └── actions ──► ActionDecoder (chainsql-abi)
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use backoff::AdaptiveBackoff;
pub use config::ConnectorConfig;
pub use error::ConnectorError;
pub use logging::{init_tracing, LogConfig};
pub use pipeline::{Consumer, PipelineStats};
pub use sink::EventSink;
pub use types::{
    Action, BlockState, ChainEvent, EventKind, PermissionLevel, TransactionMetadata,
    TransactionTrace,
};
