//! MemPool: transaction admission, prioritisation, and gossip (§4.4). One
//! lock covers the ordered queue plus its two auxiliary per-wallet maps, so
//! the seven-step admission check runs as a single atomic block.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::blockchain::{ChainView, MempoolView};
use crate::constants::{
    FAILED_PEER_PENALTY_SEC, MEMPOOL_MAX_SIZE, MIN_FEE_TO_ENTER_MEMPOOL, MAX_GOSSIP_RETRIES,
    TX_BRANCH_FACTOR,
};
use crate::errors::NodeResult;
use crate::host::HostManager;
use crate::models::block::Block;
use crate::models::mempool_entry::MempoolEntry;
use crate::models::status::ExecutionStatus;
use crate::models::transaction::Transaction;
use crate::models::wallet_address::WalletAddress;
use crate::peer_client::PeerClient;

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

struct PoolState {
    queue: BTreeSet<MempoolEntry>,
    pending_outgoing: HashMap<WalletAddress, u64>,
    next_nonce: HashMap<WalletAddress, u64>,
    to_send: VecDeque<Transaction>,
    failed_peers: HashMap<String, u64>,
}

pub struct MemPool {
    state: Mutex<PoolState>,
    chain: Arc<dyn ChainView>,
}

impl MemPool {
    pub fn new(chain: Arc<dyn ChainView>) -> MemPool {
        MemPool {
            state: Mutex::new(PoolState {
                queue: BTreeSet::new(),
                pending_outgoing: HashMap::new(),
                next_nonce: HashMap::new(),
                to_send: VecDeque::new(),
                failed_peers: HashMap::new(),
            }),
            chain,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("mempool lock poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// AddTransaction: the seven-step admission check (§4.4), run as one
    /// atomic block under the mempool lock.
    pub fn add_transaction(&self, tx: Transaction) -> NodeResult<ExecutionStatus> {
        let now = unix_now();
        let mut state = self.state.lock().expect("mempool lock poisoned");

        if tx.is_expired(now) {
            return Ok(ExecutionStatus::ExpiredTransaction);
        }
        if state.queue.iter().any(|e| e.transaction == tx) {
            return Ok(ExecutionStatus::AlreadyInQueue);
        }
        if tx.fee.as_u64() < MIN_FEE_TO_ENTER_MEMPOOL {
            return Ok(ExecutionStatus::TransactionFeeTooLow);
        }

        let status = self.chain.verify_transaction(&tx, now)?;
        if !status.is_success() {
            return Ok(status);
        }

        let total = tx.total_outgoing().ok_or(ExecutionStatus::BalanceTooLow);
        let total = match total {
            Ok(t) => t.as_u64(),
            Err(status) => return Ok(status),
        };
        let pending = state.pending_outgoing.get(&tx.from).copied().unwrap_or(0);
        let balance = self.chain.get_wallet_value(tx.from)?;
        if balance < pending + total {
            return Ok(ExecutionStatus::BalanceTooLow);
        }
        let expected_nonce = state
            .next_nonce
            .get(&tx.from)
            .copied()
            .unwrap_or(self.chain.get_wallet_nonce(tx.from)?);
        if tx.nonce != expected_nonce {
            return Ok(ExecutionStatus::InvalidNonce);
        }

        if state.queue.len() >= MEMPOOL_MAX_SIZE {
            return Ok(ExecutionStatus::QueueFull);
        }

        state.pending_outgoing.entry(tx.from).and_modify(|v| *v += total).or_insert(total);
        state.next_nonce.insert(tx.from, expected_nonce + 1);
        state.to_send.push_back(tx.clone());
        state.queue.insert(MempoolEntry { transaction: tx, arrival_time: now });

        Ok(ExecutionStatus::Success)
    }

    /// FinishBlock: removes every transaction `b` confirmed from the queue
    /// and unwinds their pendingOutgoing contribution.
    pub fn finish_block(&self, b: &Block) -> NodeResult<()> {
        let mut state = self.state.lock().expect("mempool lock poisoned");
        for tx in &b.transactions {
            if tx.is_fee {
                continue;
            }
            let was_present = {
                let before = state.queue.len();
                state.queue.retain(|e| e.transaction.hash() != tx.hash());
                state.queue.len() != before
            };
            if was_present {
                if let Some(total) = tx.total_outgoing() {
                    if let Some(pending) = state.pending_outgoing.get_mut(&tx.from) {
                        *pending = pending.saturating_sub(total.as_u64());
                        if *pending == 0 {
                            state.pending_outgoing.remove(&tx.from);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl MempoolView for MemPool {
    fn finish_block(&self, block: &Block) -> NodeResult<()> {
        MemPool::finish_block(self, block)
    }
}

impl MemPool {
    /// Cleanup loop body (60 s cadence): drops expired entries.
    pub fn cleanup_expired(&self) {
        let now = unix_now();
        let mut state = self.state.lock().expect("mempool lock poisoned");
        let expired: Vec<Transaction> = state
            .queue
            .iter()
            .filter(|e| e.transaction.is_expired(now))
            .map(|e| e.transaction.clone())
            .collect();
        for tx in &expired {
            state.queue.retain(|e| e.transaction.hash() != tx.hash());
            if let Some(total) = tx.total_outgoing() {
                if let Some(pending) = state.pending_outgoing.get_mut(&tx.from) {
                    *pending = pending.saturating_sub(total.as_u64());
                    if *pending == 0 {
                        state.pending_outgoing.remove(&tx.from);
                    }
                }
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "dropped expired mempool entries");
        }
    }

    /// Gossip loop body (100 ms cadence).
    pub async fn gossip_once(&self, host_manager: &HostManager, client: &dyn PeerClient, local_now: u64) {
        let to_send: Vec<Transaction> = {
            let mut state = self.state.lock().expect("mempool lock poisoned");

            let now = unix_now();
            let dead: Vec<crate::models::hash::Digest> = state
                .queue
                .iter()
                .filter(|e| e.transaction.is_expired(now))
                .map(|e| e.transaction.hash())
                .collect();
            for hash in dead {
                state.queue.retain(|e| e.transaction.hash() != hash);
            }

            state.to_send.drain(..).collect()
        };

        if to_send.is_empty() {
            return;
        }

        let peers = host_manager.sample_fresh_hosts(TX_BRANCH_FACTOR, local_now).await;
        let mut max_height = 0u64;
        let mut heights = HashMap::new();
        for peer in &peers {
            if let Ok(h) = client.get_block_count(peer).await {
                heights.insert(peer.clone(), h);
                max_height = max_height.max(h);
            }
        }

        let targets: Vec<String> = {
            let state = self.state.lock().expect("mempool lock poisoned");
            heights
                .into_iter()
                .filter(|(addr, h)| {
                    *h == max_height
                        && state
                            .failed_peers
                            .get(addr)
                            .map(|ts| local_now.saturating_sub(*ts) >= FAILED_PEER_PENALTY_SEC)
                            .unwrap_or(true)
                })
                .map(|(addr, _)| addr)
                .collect()
        };

        let mut requeue = Vec::new();
        for peer in &targets {
            for tx in &to_send {
                let mut delivered = false;
                for _ in 0..MAX_GOSSIP_RETRIES {
                    if client.submit_transaction(peer, tx).await.is_ok() {
                        delivered = true;
                        break;
                    }
                }
                if !delivered {
                    warn!(peer, "gossip delivery failed after retries, penalising peer");
                    let mut state = self.state.lock().expect("mempool lock poisoned");
                    state.failed_peers.insert(peer.clone(), local_now);
                    requeue.push(tx.clone());
                }
            }
        }

        if !requeue.is_empty() {
            let mut state = self.state.lock().expect("mempool lock poisoned");
            for tx in requeue {
                state.to_send.push_back(tx);
            }
        }
    }
}
