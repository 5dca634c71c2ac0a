//! Snapshot of the authoritative chain tip, read under
//! [`crate::blockchain::BlockChain`]'s lock. `height == 0` means
//! uninitialised; after genesis ingest `height == 1`.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::models::hash::Digest;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainState {
    pub tip_hash: Digest,
    pub height: u64,
    pub cumulative_work: BigUint,
    pub current_difficulty: u8,
}

impl ChainState {
    pub fn uninitialised() -> ChainState {
        ChainState {
            tip_hash: Digest::ZERO,
            height: 0,
            cumulative_work: BigUint::from(0u32),
            current_difficulty: crate::constants::MIN_DIFFICULTY,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.height > 0
    }

    pub fn work_for_difficulty(difficulty: u8) -> BigUint {
        BigUint::from(1u32) << difficulty as u32
    }
}

#[cfg(test)]
mod chain_state_tests {
    use super::*;

    #[test]
    fn uninitialised_has_zero_height() {
        let cs = ChainState::uninitialised();
        assert!(!cs.is_initialised());
        assert_eq!(cs.height, 0);
    }

    #[test]
    fn work_for_difficulty_is_a_power_of_two() {
        assert_eq!(ChainState::work_for_difficulty(0), BigUint::from(1u32));
        assert_eq!(ChainState::work_for_difficulty(6), BigUint::from(64u32));
    }
}
