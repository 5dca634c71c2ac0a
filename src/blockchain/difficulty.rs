//! Difficulty retargeting (§4.3.2): a log-scaled step clamped to
//! `[MIN_DIFFICULTY, MAX_DIFFICULTY - 1]`, evaluated only every
//! `DIFFICULTY_LOOKBACK` blocks past `2 * DIFFICULTY_LOOKBACK`.

use crate::constants::{DESIRED_BLOCK_TIME_SEC, DIFFICULTY_LOOKBACK, MIN_DIFFICULTY};

const MAX_RETARGET_DIFFICULTY: u8 = 254;

/// Whether retargeting should run at this height.
pub fn should_retarget(height: u64) -> bool {
    height > 2 * DIFFICULTY_LOOKBACK && height % DIFFICULTY_LOOKBACK == 0
}

fn abs_diff(a: u64, b: u64) -> u64 {
    a.max(b) - a.min(b)
}

/// Computes the next difficulty given the elapsed time (seconds) over the
/// last `DIFFICULTY_LOOKBACK` blocks and the current difficulty.
pub fn retarget(current: u8, elapsed_sec: u64) -> u8 {
    let target = DIFFICULTY_LOOKBACK * DESIRED_BLOCK_TIME_SEC;
    let mut d = current;

    if elapsed_sec > target {
        let mut k: u64 = 1;
        let mut best = abs_diff(elapsed_sec / k, target);
        loop {
            if d <= MIN_DIFFICULTY {
                break;
            }
            let next_k = k * 2;
            let next = abs_diff(elapsed_sec / next_k, target);
            if next < best {
                best = next;
                k = next_k;
                d -= 1;
            } else {
                break;
            }
        }
    } else if elapsed_sec < target {
        let mut k: u64 = 1;
        let mut best = abs_diff(elapsed_sec * k, target);
        loop {
            if d >= MAX_RETARGET_DIFFICULTY {
                break;
            }
            let next_k = k * 2;
            let next = abs_diff(elapsed_sec * next_k, target);
            if next < best {
                best = next;
                k = next_k;
                d += 1;
            } else {
                break;
            }
        }
    }

    d
}

#[cfg(test)]
mod difficulty_tests {
    use super::*;

    #[test]
    fn retarget_only_fires_every_lookback_window_past_twice_lookback() {
        assert!(!should_retarget(100));
        assert!(!should_retarget(150));
        assert!(should_retarget(300));
        assert!(should_retarget(400));
    }

    #[test]
    fn slow_blocks_decrease_difficulty() {
        let target = DIFFICULTY_LOOKBACK * DESIRED_BLOCK_TIME_SEC;
        let result = retarget(20, target * 4);
        assert!(result < 20);
        assert!(result >= MIN_DIFFICULTY);
    }

    #[test]
    fn fast_blocks_increase_difficulty() {
        let target = DIFFICULTY_LOOKBACK * DESIRED_BLOCK_TIME_SEC;
        let result = retarget(20, target / 4);
        assert!(result > 20);
    }

    #[test]
    fn on_target_elapsed_leaves_difficulty_unchanged() {
        let target = DIFFICULTY_LOOKBACK * DESIRED_BLOCK_TIME_SEC;
        assert_eq!(retarget(20, target), 20);
    }

    #[test]
    fn difficulty_never_drops_below_minimum() {
        let target = DIFFICULTY_LOOKBACK * DESIRED_BLOCK_TIME_SEC;
        let result = retarget(MIN_DIFFICULTY + 1, target * 1000);
        assert!(result >= MIN_DIFFICULTY);
    }
}
