//! Infrastructural error types. Validation rejections are modeled as
//! [`crate::models::status::ExecutionStatus`] values, not as `Err` variants
//! here — a `BalanceTooLow` is an expected return value, not a failure of
//! the machine reporting it. `NodeError` covers conditions that are fatal:
//! storage failures, arithmetic corruption, and sync exhaustion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("storage backend failure: {0}")]
    Storage(String),

    #[error("ledger arithmetic corruption: {0}")]
    LedgerCorruption(String),

    #[error("chain sync exceeded {0} retries")]
    SyncRetriesExhausted(u32),

    #[error("blockchain is corrupt: replay of block {block_id} failed: {status:?}")]
    CorruptChain {
        block_id: u64,
        status: crate::models::status::ExecutionStatus,
    },

    #[error("genesis file error: {0}")]
    Genesis(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type NodeResult<T> = Result<T, NodeError>;
