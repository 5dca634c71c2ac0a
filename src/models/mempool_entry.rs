//! A queued, not-yet-confirmed transaction plus its arrival time. Ordering
//! is fee desc, hash asc, matching §3's mempool contract — expressed as a
//! custom `Ord` so the mempool can hold entries directly in a `BTreeSet`.

use std::cmp::Ordering;

use crate::models::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct MempoolEntry {
    pub transaction: Transaction,
    pub arrival_time: u64,
}

impl MempoolEntry {
    pub fn new(transaction: Transaction, arrival_time: u64) -> MempoolEntry {
        MempoolEntry {
            transaction,
            arrival_time,
        }
    }
}

impl PartialEq for MempoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.transaction.hash() == other.transaction.hash()
    }
}

impl Eq for MempoolEntry {}

impl Ord for MempoolEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .transaction
            .fee
            .cmp(&self.transaction.fee)
            .then_with(|| self.transaction.hash().cmp(&other.transaction.hash()))
    }
}

impl PartialOrd for MempoolEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod mempool_entry_tests {
    use super::*;
    use crate::models::transaction::transaction_tests::{
        pseudorandom_transaction, pseudorandom_transaction_with_fee,
    };
    use std::collections::BTreeSet;

    #[test]
    fn higher_fee_sorts_first() {
        let high = pseudorandom_transaction_with_fee(
            1,
            0,
            crate::models::amount::TransactionAmount::from_smallest_unit(10),
        );
        let low = pseudorandom_transaction_with_fee(
            2,
            0,
            crate::models::amount::TransactionAmount::from_smallest_unit(1),
        );

        let mut set = BTreeSet::new();
        set.insert(MempoolEntry::new(low.clone(), 0));
        set.insert(MempoolEntry::new(high.clone(), 0));

        let first = set.iter().next().unwrap();
        assert_eq!(first.transaction.hash(), high.hash());
    }

    #[test]
    fn equal_fee_breaks_tie_by_hash() {
        let a = pseudorandom_transaction(3, 0);
        let b = pseudorandom_transaction(4, 0);
        let mut set = BTreeSet::new();
        set.insert(MempoolEntry::new(a.clone(), 0));
        set.insert(MempoolEntry::new(b.clone(), 0));

        let expected_first = if a.hash() < b.hash() { a.hash() } else { b.hash() };
        assert_eq!(set.iter().next().unwrap().transaction.hash(), expected_first);
    }
}
