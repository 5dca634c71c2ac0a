//! `TransactionAmount`: an unsigned quantity in the smallest denomination.
//! No plain `Sub`/`Add` impl is provided; callers go through
//! `checked_sub`/`checked_add` so overflow and underflow can never
//! silently wrap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

use crate::constants::DECIMAL_SCALE_FACTOR;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct TransactionAmount(u64);

impl TransactionAmount {
    pub const ZERO: TransactionAmount = TransactionAmount(0);

    pub fn from_smallest_unit(value: u64) -> TransactionAmount {
        TransactionAmount(value)
    }

    /// Whole-coin amount scaled by [`DECIMAL_SCALE_FACTOR`], used by the
    /// reward schedule which is specified in whole-coin terms.
    pub fn from_coins(coins: f64) -> TransactionAmount {
        TransactionAmount((coins * DECIMAL_SCALE_FACTOR as f64).round() as u64)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, rhs: TransactionAmount) -> Option<TransactionAmount> {
        self.0.checked_add(rhs.0).map(TransactionAmount)
    }

    pub fn checked_sub(self, rhs: TransactionAmount) -> Option<TransactionAmount> {
        self.0.checked_sub(rhs.0).map(TransactionAmount)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Sum for TransactionAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        TransactionAmount(iter.map(|a| a.0).sum())
    }
}

impl fmt::Display for TransactionAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TransactionAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionAmount({})", self.0)
    }
}

impl From<u64> for TransactionAmount {
    fn from(value: u64) -> Self {
        TransactionAmount(value)
    }
}

#[cfg(test)]
mod amount_tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checked_add_detects_overflow() {
        let a = TransactionAmount(u64::MAX);
        let b = TransactionAmount(1);
        assert_eq!(a.checked_add(b), None);
    }

    #[test]
    fn checked_sub_detects_underflow() {
        let a = TransactionAmount(5);
        let b = TransactionAmount(10);
        assert_eq!(a.checked_sub(b), None);
    }

    #[test]
    fn checked_add_sub_roundtrip() {
        let a = TransactionAmount(100);
        let b = TransactionAmount(40);
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.checked_sub(b).unwrap(), a);
    }

    #[test]
    fn from_coins_applies_scale_factor() {
        let amount = TransactionAmount::from_coins(50.0);
        assert_eq!(amount.as_u64(), 50 * DECIMAL_SCALE_FACTOR);
    }

    #[test]
    fn sum_over_iterator() {
        let amounts = vec![
            TransactionAmount(1),
            TransactionAmount(2),
            TransactionAmount(3),
        ];
        let total: TransactionAmount = amounts.into_iter().sum();
        assert_eq!(total, TransactionAmount(6));
    }

    proptest::proptest! {
        #[test]
        fn checked_add_never_panics(a in any::<u64>(), b in any::<u64>()) {
            let _ = TransactionAmount(a).checked_add(TransactionAmount(b));
        }

        #[test]
        fn checked_sub_never_panics(a in any::<u64>(), b in any::<u64>()) {
            let _ = TransactionAmount(a).checked_sub(TransactionAmount(b));
        }
    }
}
