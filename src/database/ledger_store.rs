//! Ledger: the authoritative wallet -> balance mapping (§4.2). A wallet's
//! presence in the underlying store (`Some(_)` vs `None`) *is* its
//! exists/absent distinction; no separate existence marker is kept.
//! Nonces are tracked in the same store under a distinct key namespace
//! so a restart does not regress a wallet's expected next nonce (see
//! DESIGN.md for why this departs from account models that track
//! nonces elsewhere).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::database::kv_store::KvStore;
use crate::database::rusty::RustyLevelDb;
use crate::errors::{NodeError, NodeResult};
use crate::models::wallet_address::WalletAddress;

#[derive(PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
enum LedgerKey {
    Balance(WalletAddress),
    Nonce(WalletAddress),
}

struct LedgerInner {
    store: RustyLevelDb<LedgerKey, u64>,
}

pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    pub fn open<P: AsRef<Path>>(db_path: P) -> NodeResult<Ledger> {
        let store = RustyLevelDb::open(db_path, "ledger")?;
        Ok(Ledger {
            inner: Mutex::new(LedgerInner { store }),
        })
    }

    pub fn has_wallet(&self, wallet: WalletAddress) -> NodeResult<bool> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        Ok(guard.store.get(&LedgerKey::Balance(wallet))?.is_some())
    }

    /// Creates the wallet with a zero balance. Returns an error if the
    /// wallet already exists.
    pub fn create(&self, wallet: WalletAddress) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        if guard.store.get(&LedgerKey::Balance(wallet))?.is_some() {
            return Err(NodeError::LedgerCorruption(format!(
                "wallet {} already exists",
                wallet
            )));
        }
        guard.store.put(&LedgerKey::Balance(wallet), &0)
    }

    pub fn get_balance(&self, wallet: WalletAddress) -> NodeResult<u64> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        Ok(guard.store.get(&LedgerKey::Balance(wallet))?.unwrap_or(0))
    }

    pub fn set_balance(&self, wallet: WalletAddress, amount: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        guard.store.put(&LedgerKey::Balance(wallet), &amount)
    }

    /// Rejects on overflow (`a + b < a`); overflow here is fatal per the
    /// propagation policy, so the error should be treated as such by the
    /// caller (the executor), not retried.
    pub fn deposit(&self, wallet: WalletAddress, amount: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Balance(wallet))?.unwrap_or(0);
        let new_balance = current.checked_add(amount).ok_or_else(|| {
            NodeError::LedgerCorruption(format!("balance overflow depositing to {}", wallet))
        })?;
        guard.store.put(&LedgerKey::Balance(wallet), &new_balance)
    }

    /// Rejects on underflow (`amount > balance`).
    pub fn withdraw(&self, wallet: WalletAddress, amount: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Balance(wallet))?.unwrap_or(0);
        let new_balance = current.checked_sub(amount).ok_or_else(|| {
            NodeError::LedgerCorruption(format!("balance underflow withdrawing from {}", wallet))
        })?;
        guard.store.put(&LedgerKey::Balance(wallet), &new_balance)
    }

    /// Inverse of `deposit` with no underflow guard: used only by
    /// `Executor::Rollback` to undo a deposit it itself produced.
    pub fn revert_deposit(&self, wallet: WalletAddress, amount: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Balance(wallet))?.unwrap_or(0);
        guard
            .store
            .put(&LedgerKey::Balance(wallet), &current.saturating_sub(amount))
    }

    /// Inverse of `withdraw` with no overflow guard, for the same reason.
    pub fn revert_send(&self, wallet: WalletAddress, amount: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Balance(wallet))?.unwrap_or(0);
        guard
            .store
            .put(&LedgerKey::Balance(wallet), &current.saturating_add(amount))
    }

    pub fn get_nonce(&self, wallet: WalletAddress) -> NodeResult<u64> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        Ok(guard.store.get(&LedgerKey::Nonce(wallet))?.unwrap_or(0))
    }

    pub fn increment_nonce(&self, wallet: WalletAddress) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Nonce(wallet))?.unwrap_or(0);
        guard.store.put(&LedgerKey::Nonce(wallet), &(current + 1))
    }

    /// Inverse of `increment_nonce`, for `PopBlock`.
    pub fn decrement_nonce(&self, wallet: WalletAddress) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let current = guard.store.get(&LedgerKey::Nonce(wallet))?.unwrap_or(0);
        guard.store.put(&LedgerKey::Nonce(wallet), &current.saturating_sub(1))
    }

    pub fn clear(&self) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        guard.store.clear()
    }

    /// Full snapshot of wallet balances, excluding the nonce namespace.
    pub fn get_state(&self) -> NodeResult<HashMap<WalletAddress, u64>> {
        let mut guard = self.inner.lock().expect("ledger lock poisoned");
        let entries = guard.store.iter_all()?;
        Ok(entries
            .into_iter()
            .filter_map(|(k, v)| match k {
                LedgerKey::Balance(wallet) => Some((wallet, v)),
                LedgerKey::Nonce(_) => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod ledger_tests {
    use super::*;

    fn wallet(byte: u8) -> WalletAddress {
        WalletAddress([byte; 25])
    }

    fn scratch_ledger(label: &str) -> Ledger {
        let mut path = std::env::temp_dir();
        path.push(format!("pandachain-ledger-{}-{}", label, std::process::id()));
        Ledger::open(path).unwrap()
    }

    #[test]
    fn absent_wallet_has_zero_balance_but_does_not_exist() {
        let ledger = scratch_ledger("absent");
        assert!(!ledger.has_wallet(wallet(1)).unwrap());
        assert_eq!(ledger.get_balance(wallet(1)).unwrap(), 0);
    }

    #[test]
    fn create_then_has_wallet_is_true() {
        let ledger = scratch_ledger("create");
        ledger.create(wallet(2)).unwrap();
        assert!(ledger.has_wallet(wallet(2)).unwrap());
    }

    #[test]
    fn deposit_auto_creates_wallet() {
        let ledger = scratch_ledger("deposit-autocreate");
        ledger.deposit(wallet(3), 100).unwrap();
        assert!(ledger.has_wallet(wallet(3)).unwrap());
        assert_eq!(ledger.get_balance(wallet(3)).unwrap(), 100);
    }

    #[test]
    fn withdraw_past_balance_is_rejected() {
        let ledger = scratch_ledger("underflow");
        ledger.deposit(wallet(4), 10).unwrap();
        assert!(ledger.withdraw(wallet(4), 11).is_err());
        assert_eq!(ledger.get_balance(wallet(4)).unwrap(), 10);
    }

    #[test]
    fn deposit_overflow_is_rejected() {
        let ledger = scratch_ledger("overflow");
        ledger.deposit(wallet(5), u64::MAX).unwrap();
        assert!(ledger.deposit(wallet(5), 1).is_err());
    }

    #[test]
    fn deposit_then_revert_deposit_is_identity() {
        let ledger = scratch_ledger("revert-deposit");
        let before = ledger.get_balance(wallet(6)).unwrap();
        ledger.deposit(wallet(6), 50).unwrap();
        ledger.revert_deposit(wallet(6), 50).unwrap();
        assert_eq!(ledger.get_balance(wallet(6)).unwrap(), before);
    }

    #[test]
    fn withdraw_then_revert_send_is_identity() {
        let ledger = scratch_ledger("revert-send");
        ledger.deposit(wallet(7), 50).unwrap();
        ledger.withdraw(wallet(7), 20).unwrap();
        ledger.revert_send(wallet(7), 20).unwrap();
        assert_eq!(ledger.get_balance(wallet(7)).unwrap(), 50);
    }

    #[test]
    fn nonce_starts_at_zero_and_increments() {
        let ledger = scratch_ledger("nonce");
        assert_eq!(ledger.get_nonce(wallet(8)).unwrap(), 0);
        ledger.increment_nonce(wallet(8)).unwrap();
        ledger.increment_nonce(wallet(8)).unwrap();
        assert_eq!(ledger.get_nonce(wallet(8)).unwrap(), 2);
    }

    #[test]
    fn increment_then_decrement_nonce_is_identity() {
        let ledger = scratch_ledger("nonce-decrement");
        ledger.increment_nonce(wallet(8)).unwrap();
        ledger.increment_nonce(wallet(8)).unwrap();
        ledger.decrement_nonce(wallet(8)).unwrap();
        assert_eq!(ledger.get_nonce(wallet(8)).unwrap(), 1);
    }

    #[test]
    fn clear_removes_balances_and_nonces() {
        let ledger = scratch_ledger("clear");
        ledger.deposit(wallet(9), 5).unwrap();
        ledger.increment_nonce(wallet(9)).unwrap();
        ledger.clear().unwrap();
        assert!(!ledger.has_wallet(wallet(9)).unwrap());
        assert_eq!(ledger.get_nonce(wallet(9)).unwrap(), 0);
    }

    #[test]
    fn get_state_reflects_only_balances() {
        let ledger = scratch_ledger("state");
        ledger.deposit(wallet(10), 7).unwrap();
        ledger.increment_nonce(wallet(10)).unwrap();
        let state = ledger.get_state().unwrap();
        assert_eq!(state.get(&wallet(10)), Some(&7));
    }
}
