//! Protocol-level constants shared across the chain, mempool, and host
//! manager. Values are part of the consensus contract: changing any of the
//! block-validation constants changes which blocks are considered valid.

pub const DECIMAL_SCALE_FACTOR: u64 = 10_000;

pub const DIFFICULTY_LOOKBACK: u64 = 100;
pub const DESIRED_BLOCK_TIME_SEC: u64 = 90;
pub const MIN_DIFFICULTY: u8 = 6;
pub const MAX_DIFFICULTY: u8 = 255;

pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 25_000;
pub const BLOCKS_PER_FETCH: u64 = 200;
pub const BLOCK_HEADERS_PER_FETCH: u64 = 2000;

pub const TRANSACTION_EXPIRY_SEC: u64 = 3600;
pub const HOST_MIN_FRESHNESS_SEC: u64 = 3 * 60 * 60;

pub const FORK_CHAIN_POP_COUNT: u64 = 100;
pub const FORK_RESET_RETRIES: u32 = 25;

pub const RANDOM_GOOD_HOST_COUNT: usize = 9;
pub const ADD_PEER_BRANCH_FACTOR: usize = 10;
pub const TX_BRANCH_FACTOR: usize = 10;
pub const MAX_GOSSIP_RETRIES: u32 = 3;
pub const FAILED_PEER_PENALTY_SEC: u64 = 24 * 60 * 60;

pub const MEMPOOL_MAX_SIZE: usize = 24_999;
pub const MIN_FEE_TO_ENTER_MEMPOOL: u64 = 1;

/// Historical fork offset folded into the block id before applying the
/// halving schedule. Three prior network resets each added their own offset;
/// nobody alive remembers why 125180 or 7750 specifically, only that 18000
/// came last. Preserved because changing it would change every reward past
/// genesis.
pub const REWARD_HEIGHT_OFFSET: u64 = 125_180 + 7_750 + 18_000;
pub const REWARD_HALVING_INTERVAL: u64 = 666_666;
pub const INITIAL_REWARD_PDN: f64 = 50.0;

/// Hard-coded consensus patch: this id range accepted difficulty 27 even
/// though the retargeting formula would have produced a different value.
/// Provenance is lost; the exception is preserved for chain continuity.
pub const DIFFICULTY_EXCEPTION_RANGE: std::ops::RangeInclusive<u64> = 536_100..=536_200;
pub const DIFFICULTY_EXCEPTION_VALUE: u8 = 27;

pub const FUTURE_TIMESTAMP_LIMIT_SEC: u64 = 2 * 60 * 60;
pub const TIMESTAMP_MEDIAN_WINDOW: usize = 10;

pub const PEER_HTTP_TIMEOUT_SEC: u64 = 5;
pub const BLOCK_FETCH_TIMEOUT_SEC: u64 = 30;
pub const HEADER_FETCH_TIMEOUT_SEC: u64 = 60;
pub const BLOCK_SUBMIT_TIMEOUT_SEC: u64 = 30;

pub const CHAIN_SYNC_INTERVAL_SEC: u64 = 10;
pub const PEER_PING_INTERVAL_SEC: u64 = 5 * 60;
pub const HEADER_STATS_INTERVAL_SEC: u64 = 30;
pub const MEMPOOL_GOSSIP_INTERVAL_MS: u64 = 100;
pub const MEMPOOL_CLEANUP_INTERVAL_SEC: u64 = 60;

pub const GENESIS_BLOCK_ID: u64 = 0;
pub const WALLET_ADDRESS_LEN: usize = 25;
