//! A delta is a reversible per-call map of wallet -> signed balance change
//! produced by the executor. Positive entries are net deposits, negative
//! entries are net withdrawals; `Rollback` applies each entry's negation.

use std::collections::HashMap;

use crate::models::wallet_address::WalletAddress;

#[derive(Debug, Default, Clone)]
pub struct LedgerDelta {
    changes: HashMap<WalletAddress, i128>,
    nonce_increments: HashMap<WalletAddress, u64>,
}

impl LedgerDelta {
    pub fn new() -> LedgerDelta {
        LedgerDelta::default()
    }

    pub fn record_deposit(&mut self, wallet: WalletAddress, amount: u64) {
        *self.changes.entry(wallet).or_insert(0) += amount as i128;
    }

    pub fn record_withdraw(&mut self, wallet: WalletAddress, amount: u64) {
        *self.changes.entry(wallet).or_insert(0) -= amount as i128;
    }

    pub fn record_nonce_increment(&mut self, wallet: WalletAddress) {
        *self.nonce_increments.entry(wallet).or_insert(0) += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WalletAddress, &i128)> {
        self.changes.iter()
    }

    pub fn nonce_increments(&self) -> impl Iterator<Item = (&WalletAddress, &u64)> {
        self.nonce_increments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.nonce_increments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod ledger_delta_tests {
    use super::*;

    fn wallet(byte: u8) -> WalletAddress {
        WalletAddress([byte; 25])
    }

    #[test]
    fn deposit_then_withdraw_nets_to_zero() {
        let mut delta = LedgerDelta::new();
        delta.record_deposit(wallet(1), 100);
        delta.record_withdraw(wallet(1), 100);
        let (_, v) = delta.iter().next().unwrap();
        assert_eq!(*v, 0);
    }

    #[test]
    fn independent_wallets_do_not_interfere() {
        let mut delta = LedgerDelta::new();
        delta.record_deposit(wallet(1), 50);
        delta.record_withdraw(wallet(2), 30);
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn empty_delta_reports_empty() {
        let delta = LedgerDelta::new();
        assert!(delta.is_empty());
    }

    #[test]
    fn nonce_increment_is_tracked_separately_from_balance_changes() {
        let mut delta = LedgerDelta::new();
        delta.record_nonce_increment(wallet(1));
        delta.record_nonce_increment(wallet(1));
        assert!(!delta.is_empty());
        let (_, count) = delta.nonce_increments().next().unwrap();
        assert_eq!(*count, 2);
    }
}
