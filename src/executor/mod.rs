//! Pure validation/mutation functions over the ledger (§4.1). Every
//! mutation here also mirrors into a [`LedgerDelta`] so the caller
//! ([`crate::blockchain::BlockChain`]) can roll the whole operation back on
//! a later failure without re-deriving what changed.

use tracing::warn;

use crate::database::ledger_store::Ledger;
use crate::database::tx_store::TxStore;
use crate::models::block::Block;
use crate::models::ledger_state::LedgerDelta;
use crate::models::status::ExecutionStatus;
use crate::models::transaction::Transaction;
use crate::models::wallet_address::WalletAddress;

/// Applies a single transaction to `ledger`, recording the change in
/// `delta`. `block_id == 1` designates the genesis block, whose non-fee
/// transactions seed initial balances without requiring the sender to
/// already exist.
pub fn apply_transaction(
    tx: &Transaction,
    miner: WalletAddress,
    ledger: &Ledger,
    delta: &mut LedgerDelta,
    block_reward: u64,
    block_id: u64,
) -> crate::errors::NodeResult<ExecutionStatus> {
    if tx.is_fee {
        if tx.amount.as_u64() != block_reward {
            warn!(
                expected = block_reward,
                actual = tx.amount.as_u64(),
                "fee transaction amount does not match block reward"
            );
            return Ok(ExecutionStatus::IncorrectMiningFee);
        }
        ledger.deposit(tx.to, tx.amount.as_u64())?;
        delta.record_deposit(tx.to, tx.amount.as_u64());
        return Ok(ExecutionStatus::Success);
    }

    if block_id == 1 {
        ledger.deposit(tx.to, tx.amount.as_u64())?;
        delta.record_deposit(tx.to, tx.amount.as_u64());
        return Ok(ExecutionStatus::Success);
    }

    if !tx.wallet_matches_signing_key() {
        warn!(from = %tx.from, "signing key does not hash to the claimed sender wallet");
        return Ok(ExecutionStatus::WalletSignatureMismatch);
    }

    if !ledger.has_wallet(tx.from)? {
        warn!(from = %tx.from, "sender wallet does not exist");
        return Ok(ExecutionStatus::SenderDoesNotExist);
    }

    let Some(total) = tx.total_outgoing() else {
        warn!(from = %tx.from, "amount + fee overflows, treating as insufficient balance");
        return Ok(ExecutionStatus::BalanceTooLow);
    };

    let balance = ledger.get_balance(tx.from)?;
    if balance < total.as_u64() {
        warn!(from = %tx.from, balance, required = total.as_u64(), "balance too low");
        return Ok(ExecutionStatus::BalanceTooLow);
    }

    ledger.withdraw(tx.from, total.as_u64())?;
    delta.record_withdraw(tx.from, total.as_u64());

    ledger.deposit(tx.to, tx.amount.as_u64())?;
    delta.record_deposit(tx.to, tx.amount.as_u64());

    if !tx.fee.is_zero() {
        ledger.deposit(miner, tx.fee.as_u64())?;
        delta.record_deposit(miner, tx.fee.as_u64());
    }

    ledger.increment_nonce(tx.from)?;
    delta.record_nonce_increment(tx.from);

    Ok(ExecutionStatus::Success)
}

/// Two-pass block application. Pass one establishes block-level structural
/// facts (duplicate hashes, tx-db membership, exactly one fee transaction);
/// pass two verifies signatures and mutates the ledger transaction by
/// transaction. The first non-success status short-circuits and is
/// returned to the caller, which is responsible for rolling `delta` back.
pub fn apply_block(
    block: &Block,
    ledger: &Ledger,
    txdb: &TxStore,
    delta: &mut LedgerDelta,
    block_reward: u64,
) -> crate::errors::NodeResult<ExecutionStatus> {
    use std::collections::HashSet;

    let mut seen = HashSet::with_capacity(block.transactions.len());
    let mut miner = None;
    let mut found_fee = false;

    for tx in &block.transactions {
        if tx.is_fee {
            if found_fee {
                warn!(block_id = block.id, "block carries more than one fee transaction");
                return Ok(ExecutionStatus::ExtraMiningFee);
            }
            found_fee = true;
            miner = Some(tx.to);
        } else {
            if !seen.insert(tx.hash()) {
                warn!(block_id = block.id, tx = %tx.hash(), "duplicate transaction hash within block");
                return Ok(ExecutionStatus::ExpiredTransaction);
            }
            if !block.is_genesis() && txdb.has_transaction(tx.hash())? {
                warn!(block_id = block.id, tx = %tx.hash(), "transaction already confirmed in an earlier block");
                return Ok(ExecutionStatus::ExpiredTransaction);
            }
        }
    }

    let Some(miner) = miner else {
        if !found_fee {
            warn!(block_id = block.id, "block carries no fee transaction");
        }
        return Ok(ExecutionStatus::NoMiningFee);
    };

    for tx in &block.transactions {
        if !tx.is_fee && !block.is_genesis() && !tx.signature_valid() {
            warn!(block_id = block.id, tx = %tx.hash(), "invalid transaction signature");
            return Ok(ExecutionStatus::InvalidSignature);
        }
        let status = apply_transaction(tx, miner, ledger, delta, block_reward, block.id)?;
        if !status.is_success() {
            return Ok(status);
        }
    }

    Ok(ExecutionStatus::Success)
}

/// Inverts every change recorded in `delta`. Only ever called on a delta
/// this module itself produced; after it returns, `ledger` is bit-identical
/// to its pre-call state.
pub fn rollback(delta: &LedgerDelta, ledger: &Ledger) -> crate::errors::NodeResult<()> {
    for (wallet, signed_amount) in delta.iter() {
        if *signed_amount >= 0 {
            ledger.revert_deposit(*wallet, *signed_amount as u64)?;
        } else {
            ledger.revert_send(*wallet, signed_amount.unsigned_abs() as u64)?;
        }
    }
    for (wallet, count) in delta.nonce_increments() {
        for _ in 0..*count {
            ledger.decrement_nonce(*wallet)?;
        }
    }
    Ok(())
}

/// Rolls back a committed block by replaying the inverse of each
/// transaction in reverse order and removing non-fee transactions from the
/// tx index. Used by `BlockChain::PopBlock`.
pub fn rollback_block(
    block: &Block,
    ledger: &Ledger,
    txdb: &TxStore,
) -> crate::errors::NodeResult<()> {
    let miner = block
        .fee_transactions()
        .next()
        .map(|tx| tx.to)
        .unwrap_or(WalletAddress::NULL);

    for tx in block.transactions.iter().rev() {
        if tx.is_fee {
            ledger.revert_deposit(tx.to, tx.amount.as_u64())?;
            continue;
        }
        if !tx.fee.is_zero() {
            ledger.revert_deposit(miner, tx.fee.as_u64())?;
            ledger.revert_send(tx.from, tx.fee.as_u64())?;
        }
        ledger.revert_deposit(tx.to, tx.amount.as_u64())?;
        ledger.revert_send(tx.from, tx.amount.as_u64())?;
        ledger.decrement_nonce(tx.from)?;
        txdb.remove_transaction(tx.hash())?;
    }
    Ok(())
}
