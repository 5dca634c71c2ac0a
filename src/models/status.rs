//! Universal validation-result contract shared by the executor, the
//! blockchain, and the mempool. This is protocol data compared structurally
//! by callers, not an [`std::error::Error`] — most of these variants are
//! routine, expected outcomes of validating attacker- or peer-supplied
//! input, so it intentionally does not derive `thiserror::Error`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,

    // Validation - non-retryable, per-tx or per-block.
    SenderDoesNotExist,
    BalanceTooLow,
    InvalidSignature,
    InvalidNonce,
    WalletSignatureMismatch,
    InvalidMerkleRoot,
    InvalidDifficulty,
    InvalidBlockId,
    InvalidLastBlockHash,
    InvalidTransactionCount,
    BlockTimestampTooOld,
    BlockTimestampInFuture,
    IncorrectMiningFee,
    ExtraMiningFee,
    NoMiningFee,
    HeaderHashInvalid,

    // Transient / retryable.
    IsSyncing,
    QueueFull,
    AlreadyInQueue,
    ExpiredTransaction,
    TransactionFeeTooLow,

    // Infrastructural.
    UnknownError,
}

impl ExecutionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    /// Categories from spec.md §7, used by callers deciding whether a
    /// rejection should ever be retried against the same input.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ExecutionStatus::IsSyncing
                | ExecutionStatus::QueueFull
                | ExecutionStatus::AlreadyInQueue
                | ExecutionStatus::ExpiredTransaction
                | ExecutionStatus::TransactionFeeTooLow
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        ExecutionStatus::Success
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn success_is_not_retryable() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(!ExecutionStatus::Success.is_retryable());
    }

    #[test]
    fn queue_full_is_retryable_but_not_success() {
        assert!(!ExecutionStatus::QueueFull.is_success());
        assert!(ExecutionStatus::QueueFull.is_retryable());
    }

    #[test]
    fn balance_too_low_is_neither_success_nor_retryable() {
        assert!(!ExecutionStatus::BalanceTooLow.is_success());
        assert!(!ExecutionStatus::BalanceTooLow.is_retryable());
    }
}
