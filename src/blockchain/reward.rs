//! Mining fee schedule (§4.3.3): `reward(id) = 50 * (2/3)^floor((id + OFFSET)/INTERVAL)`.

use crate::constants::{INITIAL_REWARD_PDN, REWARD_HALVING_INTERVAL, REWARD_HEIGHT_OFFSET};
use crate::models::amount::TransactionAmount;

/// Block reward for block `id`, in smallest-denomination units.
pub fn block_reward(id: u64) -> TransactionAmount {
    let halvings = (id + REWARD_HEIGHT_OFFSET) / REWARD_HALVING_INTERVAL;
    let coins = INITIAL_REWARD_PDN * (2.0f64 / 3.0f64).powi(halvings as i32);
    TransactionAmount::from_coins(coins)
}

#[cfg(test)]
mod reward_tests {
    use super::*;

    #[test]
    fn genesis_reward_matches_initial_schedule_point() {
        let r = block_reward(1);
        assert!(r.as_u64() > 0);
    }

    #[test]
    fn reward_is_non_increasing_across_a_halving_boundary() {
        let before = block_reward(REWARD_HALVING_INTERVAL - REWARD_HEIGHT_OFFSET - 1);
        let after = block_reward(REWARD_HALVING_INTERVAL - REWARD_HEIGHT_OFFSET);
        assert!(after.as_u64() <= before.as_u64());
    }

    #[test]
    fn reward_never_exceeds_initial_reward() {
        let r = block_reward(10_000_000);
        let initial = TransactionAmount::from_coins(INITIAL_REWARD_PDN);
        assert!(r.as_u64() <= initial.as_u64());
    }
}
