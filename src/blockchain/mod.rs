//! BlockChain: the authoritative chain driver (§4.3). A single lock
//! guards chain-tip state; validation runs under that lock but all disk
//! writes are local and bounded, so holding the lock across them is
//! acceptable (§5).

pub mod difficulty;
pub mod reward;

use std::sync::{Arc, Mutex, OnceLock};

use num_bigint::BigUint;
use tracing::{error, warn};

use crate::constants::{
    DIFFICULTY_EXCEPTION_RANGE, DIFFICULTY_EXCEPTION_VALUE, DIFFICULTY_LOOKBACK,
    FORK_CHAIN_POP_COUNT, FORK_RESET_RETRIES, FUTURE_TIMESTAMP_LIMIT_SEC,
    MAX_TRANSACTIONS_PER_BLOCK, TIMESTAMP_MEDIAN_WINDOW,
};
use crate::database::block_store::BlockStore;
use crate::database::ledger_store::Ledger;
use crate::database::tx_store::TxStore;
use crate::errors::{NodeError, NodeResult};
use crate::executor;
use crate::host::HostManager;
use crate::models::block::Block;
use crate::models::chain_state::ChainState;
use crate::models::ledger_state::LedgerDelta;
use crate::models::status::ExecutionStatus;
use crate::models::transaction::Transaction;
use crate::models::wallet_address::WalletAddress;
use crate::peer_client::PeerClient;

/// Narrow read surface MemPool needs from BlockChain, breaking the
/// BlockChain <-> MemPool construction cycle (§9).
pub trait ChainView: Send + Sync {
    fn verify_transaction(&self, tx: &Transaction, now_unix: u64) -> NodeResult<ExecutionStatus>;
    fn get_wallet_value(&self, wallet: WalletAddress) -> NodeResult<u64>;
    fn get_wallet_nonce(&self, wallet: WalletAddress) -> NodeResult<u64>;
}

/// Narrow surface BlockChain needs to notify MemPool after a block lands.
pub trait MempoolView: Send + Sync {
    fn finish_block(&self, block: &Block) -> NodeResult<()>;
}

struct SyncState {
    is_syncing: bool,
    retry_count: u32,
}

pub struct BlockChain {
    chain: Mutex<ChainState>,
    sync: Mutex<SyncState>,
    ledger: Arc<Ledger>,
    blocks: Arc<BlockStore>,
    txdb: Arc<TxStore>,
    genesis: Block,
    mempool: OnceLock<Arc<dyn MempoolView>>,
}

impl BlockChain {
    pub fn new(
        ledger: Arc<Ledger>,
        blocks: Arc<BlockStore>,
        txdb: Arc<TxStore>,
        genesis: Block,
    ) -> NodeResult<BlockChain> {
        let chain_state = Self::load_or_ingest_genesis(&ledger, &blocks, &txdb, &genesis)?;
        Ok(BlockChain {
            chain: Mutex::new(chain_state),
            sync: Mutex::new(SyncState { is_syncing: false, retry_count: 0 }),
            ledger,
            blocks,
            txdb,
            genesis,
            mempool: OnceLock::new(),
        })
    }

    fn load_or_ingest_genesis(
        ledger: &Ledger,
        blocks: &BlockStore,
        txdb: &TxStore,
        genesis: &Block,
    ) -> NodeResult<ChainState> {
        let height = blocks.block_count()?;
        if height > 0 {
            let tip = blocks
                .get_block(height)?
                .ok_or_else(|| NodeError::Genesis("stored height but missing tip block".into()))?;
            return Ok(ChainState {
                tip_hash: tip.hash(),
                height,
                cumulative_work: blocks.total_work()?,
                current_difficulty: tip.difficulty,
            });
        }

        let mut delta = LedgerDelta::new();
        let reward = reward::block_reward(genesis.id).as_u64();
        let status = executor::apply_block(genesis, ledger, txdb, &mut delta, reward)?;
        if !status.is_success() {
            return Err(NodeError::Genesis(format!("genesis block rejected: {status:?}")));
        }
        blocks.put_block(genesis)?;
        for tx in &genesis.transactions {
            if !tx.is_fee {
                txdb.insert_transaction(tx.hash(), genesis.id)?;
            }
        }
        blocks.set_block_count(1)?;
        let work = ChainState::work_for_difficulty(genesis.difficulty);
        blocks.set_total_work(&work)?;

        Ok(ChainState {
            tip_hash: genesis.hash(),
            height: 1,
            cumulative_work: work,
            current_difficulty: genesis.difficulty,
        })
    }

    pub fn register_mempool(&self, mempool: Arc<dyn MempoolView>) {
        let _ = self.mempool.set(mempool);
    }

    pub fn height(&self) -> u64 {
        self.chain.lock().expect("chain lock poisoned").height
    }

    pub fn tip_hash(&self) -> crate::models::hash::Digest {
        self.chain.lock().expect("chain lock poisoned").tip_hash
    }

    pub fn current_difficulty(&self) -> u8 {
        self.chain.lock().expect("chain lock poisoned").current_difficulty
    }

    pub fn cumulative_work(&self) -> BigUint {
        self.chain.lock().expect("chain lock poisoned").cumulative_work.clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.lock().expect("sync lock poisoned").is_syncing
    }

    fn expected_difficulty(state: &ChainState, id: u64) -> u8 {
        if DIFFICULTY_EXCEPTION_RANGE.contains(&id) {
            DIFFICULTY_EXCEPTION_VALUE
        } else {
            state.current_difficulty
        }
    }

    fn median_of_last_timestamps(&self, height: u64) -> NodeResult<u64> {
        let window = TIMESTAMP_MEDIAN_WINDOW as u64;
        let mut timestamps = Vec::with_capacity(window as usize);
        for id in (height.saturating_sub(window) + 1)..=height {
            if let Some(b) = self.blocks.get_block(id)? {
                timestamps.push(b.timestamp);
            }
        }
        timestamps.sort_unstable();
        Ok(timestamps[timestamps.len() / 2])
    }

    /// AddBlock: validates `block` against the current tip and, on
    /// success, commits it and notifies the registered mempool.
    pub fn add_block(&self, block: Block, network_now: u64) -> NodeResult<ExecutionStatus> {
        let mut state = self.chain.lock().expect("chain lock poisoned");

        if !block.tx_count_within_limit(MAX_TRANSACTIONS_PER_BLOCK) {
            return Ok(ExecutionStatus::InvalidTransactionCount);
        }
        if block.id != state.height + 1 {
            return Ok(ExecutionStatus::InvalidBlockId);
        }
        if block.difficulty != Self::expected_difficulty(&state, block.id) {
            return Ok(ExecutionStatus::InvalidDifficulty);
        }
        if !block.has_proof_of_work() {
            return Ok(ExecutionStatus::InvalidDifficulty);
        }
        if block.last_block_hash != state.tip_hash {
            return Ok(ExecutionStatus::InvalidLastBlockHash);
        }
        if block.id > 1 {
            if block.timestamp > network_now + FUTURE_TIMESTAMP_LIMIT_SEC {
                return Ok(ExecutionStatus::BlockTimestampInFuture);
            }
            if state.height > TIMESTAMP_MEDIAN_WINDOW as u64 {
                let median = self.median_of_last_timestamps(state.height)?;
                if block.timestamp < median {
                    return Ok(ExecutionStatus::BlockTimestampTooOld);
                }
            }
        }
        if !block.merkle_root_matches() {
            return Ok(ExecutionStatus::InvalidMerkleRoot);
        }

        let block_reward = reward::block_reward(block.id).as_u64();
        let mut delta = LedgerDelta::new();
        let status = executor::apply_block(&block, &self.ledger, &self.txdb, &mut delta, block_reward)?;
        if !status.is_success() {
            executor::rollback(&delta, &self.ledger)?;
            return Ok(status);
        }

        self.blocks.put_block(&block)?;
        for tx in &block.transactions {
            if !tx.is_fee {
                self.txdb.insert_transaction(tx.hash(), block.id)?;
                self.blocks.index_wallet_tx(tx.from, tx.hash())?;
                self.blocks.index_wallet_tx(tx.to, tx.hash())?;
            }
        }

        state.tip_hash = block.hash();
        state.height += 1;
        state.cumulative_work += ChainState::work_for_difficulty(block.difficulty);
        self.blocks.set_block_count(state.height)?;
        self.blocks.set_total_work(&state.cumulative_work)?;

        if difficulty::should_retarget(state.height) {
            if let Some(prior) = self.blocks.get_block(state.height - DIFFICULTY_LOOKBACK)? {
                let elapsed = block.timestamp.saturating_sub(prior.timestamp);
                state.current_difficulty = difficulty::retarget(state.current_difficulty, elapsed);
            }
        }

        let committed = block.clone();
        drop(state);

        if let Some(mempool) = self.mempool.get() {
            mempool.finish_block(&committed)?;
        }

        Ok(ExecutionStatus::Success)
    }

    /// PopBlock: rolls back the tip block. Resets the whole chain from
    /// genesis if height drops to zero.
    pub fn pop_block(&self) -> NodeResult<()> {
        let mut state = self.chain.lock().expect("chain lock poisoned");
        if state.height == 0 {
            return Ok(());
        }

        let tip = self
            .blocks
            .get_block(state.height)?
            .ok_or_else(|| NodeError::Storage("missing tip block during pop".into()))?;

        executor::rollback_block(&tip, &self.ledger, &self.txdb)?;
        self.blocks.remove_block(state.height)?;
        self.blocks.unindex_block_wallets(&tip)?;

        state.cumulative_work -= ChainState::work_for_difficulty(tip.difficulty);
        state.height -= 1;

        if state.height == 0 {
            drop(state);
            return self.reset_chain();
        }

        let new_tip = self
            .blocks
            .get_block(state.height)?
            .ok_or_else(|| NodeError::Storage("missing new tip after pop".into()))?;
        state.tip_hash = new_tip.hash();
        state.current_difficulty = new_tip.difficulty;
        self.blocks.set_block_count(state.height)?;
        self.blocks.set_total_work(&state.cumulative_work)?;
        Ok(())
    }

    fn reset_chain(&self) -> NodeResult<()> {
        self.ledger.clear()?;
        self.blocks.clear()?;
        self.txdb.clear()?;
        let fresh = Self::load_or_ingest_genesis(&self.ledger, &self.blocks, &self.txdb, &self.genesis)?;
        *self.chain.lock().expect("chain lock poisoned") = fresh;
        Ok(())
    }

    /// RecomputeLedger: replays every stored block from id 1 through the
    /// current height into a freshly cleared ledger. Startup recovery only.
    pub fn recompute_ledger(&self) -> NodeResult<()> {
        self.ledger.clear()?;
        let height = self.height();
        for id in 1..=height {
            let block = self
                .blocks
                .get_block(id)?
                .ok_or_else(|| NodeError::LedgerCorruption(format!("missing block {id} during replay")))?;
            let mut delta = LedgerDelta::new();
            let reward = reward::block_reward(id).as_u64();
            let status = executor::apply_block(&block, &self.ledger, &self.txdb, &mut delta, reward)?;
            if !status.is_success() {
                error!(block_id = id, status = ?status, "ledger replay failed, on-disk history is corrupt");
                return Err(NodeError::CorruptChain { block_id: id, status });
            }
        }
        Ok(())
    }

    /// VerifyTransaction (§4.3.4): a dry-run admission check used before a
    /// transaction enters the mempool.
    pub fn verify_transaction(&self, tx: &Transaction, now_unix: u64) -> NodeResult<ExecutionStatus> {
        if self.is_syncing() {
            return Ok(ExecutionStatus::IsSyncing);
        }
        if tx.is_fee {
            return Ok(ExecutionStatus::ExtraMiningFee);
        }
        if !tx.signature_valid() {
            return Ok(ExecutionStatus::InvalidSignature);
        }
        let expected_nonce = self.ledger.get_nonce(tx.from)?;
        if tx.nonce != expected_nonce {
            return Ok(ExecutionStatus::InvalidNonce);
        }
        if self.txdb.has_transaction(tx.hash())? {
            return Ok(ExecutionStatus::ExpiredTransaction);
        }

        let height = self.height();
        let mut delta = LedgerDelta::new();
        let status = executor::apply_transaction(
            tx,
            WalletAddress::NULL,
            &self.ledger,
            &mut delta,
            0,
            height + 1,
        )?;
        executor::rollback(&delta, &self.ledger)?;
        let _ = now_unix;
        Ok(status)
    }

    /// StartChainSync (§4.3, 10 s cadence): compares local work against a
    /// peer's, reorganises to the fork point if the peer is ahead, then
    /// fetches and applies blocks forward in batches.
    pub async fn start_chain_sync(
        &self,
        host_manager: &HostManager,
        client: &dyn PeerClient,
        network_now: u64,
    ) -> NodeResult<()> {
        {
            let mut sync = self.sync.lock().expect("sync lock poisoned");
            if sync.is_syncing {
                return Ok(());
            }
            sync.is_syncing = true;
        }

        let result = self.run_chain_sync(host_manager, client, network_now).await;

        let mut sync = self.sync.lock().expect("sync lock poisoned");
        sync.is_syncing = false;
        match &result {
            Ok(()) => sync.retry_count = 0,
            Err(_) => {
                sync.retry_count += 1;
                if sync.retry_count > FORK_RESET_RETRIES {
                    error!("chain sync retries exhausted");
                    return Err(NodeError::SyncRetriesExhausted(sync.retry_count));
                }
            }
        }
        result
    }

    async fn run_chain_sync(
        &self,
        host_manager: &HostManager,
        client: &dyn PeerClient,
        network_now: u64,
    ) -> NodeResult<()> {
        let Some(peer) = host_manager.best_peer().await else {
            return Ok(());
        };
        let peer_work = client.get_total_work(&peer).await.unwrap_or_default();
        let local_work = self.cumulative_work();
        if peer_work <= local_work {
            return Ok(());
        }

        let height = self.height();
        let mut divergence = height + 1;
        for id in 1..=height {
            let Ok(peer_hash) = client.get_block_hash(&peer, id).await else {
                break;
            };
            let Some(local_block) = self.blocks.get_block(id)? else {
                break;
            };
            if peer_hash != local_block.hash() {
                divergence = id;
                break;
            }
        }

        if divergence <= height {
            let target_height = divergence.saturating_sub(1);
            while self.height() > target_height {
                self.pop_block()?;
            }
            for _ in 0..FORK_CHAIN_POP_COUNT {
                if self.height() == 0 {
                    break;
                }
                self.pop_block()?;
            }
        }

        loop {
            let start = self.height() + 1;
            let batch = client
                .get_blocks(&peer, start, crate::constants::BLOCKS_PER_FETCH)
                .await?;
            if batch.is_empty() {
                break;
            }
            for block in batch {
                let status = self.add_block(block, network_now)?;
                if !status.is_success() {
                    warn!(status = ?status, "sync aborted: peer offered an invalid block");
                    return Err(NodeError::Storage(format!("sync rejected block: {status:?}")));
                }
            }
        }

        Ok(())
    }
}

impl ChainView for BlockChain {
    fn verify_transaction(&self, tx: &Transaction, now_unix: u64) -> NodeResult<ExecutionStatus> {
        BlockChain::verify_transaction(self, tx, now_unix)
    }

    fn get_wallet_value(&self, wallet: WalletAddress) -> NodeResult<u64> {
        self.ledger.get_balance(wallet)
    }

    fn get_wallet_nonce(&self, wallet: WalletAddress) -> NodeResult<u64> {
        self.ledger.get_nonce(wallet)
    }
}

#[cfg(test)]
mod blockchain_tests {
    use super::*;
    use crate::models::block::block_tests::pseudorandom_block;
    use crate::models::hash::Digest;

    fn scratch_chain(label: &str) -> BlockChain {
        let mut ledger_path = std::env::temp_dir();
        ledger_path.push(format!("pandachain-bc-ledger-{}-{}", label, std::process::id()));
        let mut blocks_path = std::env::temp_dir();
        blocks_path.push(format!("pandachain-bc-blocks-{}-{}", label, std::process::id()));
        let mut tx_path = std::env::temp_dir();
        tx_path.push(format!("pandachain-bc-txdb-{}-{}", label, std::process::id()));

        let ledger = Arc::new(Ledger::open(ledger_path).unwrap());
        let blocks = Arc::new(BlockStore::open(blocks_path).unwrap());
        let txdb = Arc::new(TxStore::open(tx_path).unwrap());
        let genesis = pseudorandom_block(label.len() as u64, 1, Digest::ZERO);
        BlockChain::new(ledger, blocks, txdb, genesis).unwrap()
    }

    #[test]
    fn genesis_ingest_sets_height_to_one() {
        let chain = scratch_chain("genesis");
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn wrong_block_id_is_rejected() {
        let chain = scratch_chain("wrong-id");
        let bad = pseudorandom_block(99, 5, chain.tip_hash());
        let status = chain.add_block(bad, 1_700_100_000).unwrap();
        assert_eq!(status, ExecutionStatus::InvalidBlockId);
    }

    #[test]
    fn wrong_last_block_hash_is_rejected() {
        let chain = scratch_chain("wrong-hash");
        let mut bad = pseudorandom_block(99, 2, Digest::hash_bytes(b"not-the-tip"));
        bad = mine_to_difficulty(bad, chain.current_difficulty());
        let status = chain.add_block(bad, 1_700_100_000).unwrap();
        assert_eq!(status, ExecutionStatus::InvalidLastBlockHash);
    }

    fn mine_to_difficulty(mut block: Block, difficulty: u8) -> Block {
        let mut nonce = 0u64;
        loop {
            block.set_nonce(nonce);
            if block.has_proof_of_work() {
                return block;
            }
            nonce += 1;
        }
    }
}
