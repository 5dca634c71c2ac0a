//! BlockStore: block-id -> block mapping plus the running block-count and
//! total-work counters, and a secondary wallet -> tx-hash index used to
//! answer "which blocks touched this wallet" without a full chain scan.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use crate::database::kv_store::KvStore;
use crate::database::rusty::RustyLevelDb;
use crate::errors::{NodeError, NodeResult};
use crate::models::block::Block;
use crate::models::hash::Digest;
use crate::models::wallet_address::WalletAddress;

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash)]
enum StoreKey {
    Block(u64),
    BlockCount,
    TotalWork,
    WalletIndex(WalletAddress),
}

#[derive(Serialize, Deserialize)]
enum StoreValue {
    Block(Block),
    Count(u64),
    Work(String),
    WalletIndex(Vec<Digest>),
}

pub struct BlockStore {
    inner: Mutex<RustyLevelDb<StoreKey, StoreValue>>,
}

impl BlockStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> NodeResult<BlockStore> {
        let store = RustyLevelDb::open(db_path, "blocks")?;
        Ok(BlockStore {
            inner: Mutex::new(store),
        })
    }

    pub fn get_block(&self, id: u64) -> NodeResult<Option<Block>> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        match guard.get(&StoreKey::Block(id))? {
            Some(StoreValue::Block(b)) => Ok(Some(b)),
            Some(_) => Err(NodeError::Storage("block key held non-block value".into())),
            None => Ok(None),
        }
    }

    pub fn put_block(&self, block: &Block) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        guard.put(&StoreKey::Block(block.id), &StoreValue::Block(block.clone()))
    }

    pub fn remove_block(&self, id: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        guard.delete(&StoreKey::Block(id))?;
        Ok(())
    }

    pub fn block_count(&self) -> NodeResult<u64> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        match guard.get(&StoreKey::BlockCount)? {
            Some(StoreValue::Count(c)) => Ok(c),
            Some(_) => Err(NodeError::Storage("block_count key holds wrong type".into())),
            None => Ok(0),
        }
    }

    pub fn set_block_count(&self, count: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        guard.put(&StoreKey::BlockCount, &StoreValue::Count(count))
    }

    pub fn total_work(&self) -> NodeResult<BigUint> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        match guard.get(&StoreKey::TotalWork)? {
            Some(StoreValue::Work(s)) => BigUint::from_str(&s)
                .map_err(|e| NodeError::Storage(format!("corrupt total_work: {e}"))),
            Some(_) => Err(NodeError::Storage("total_work key holds wrong type".into())),
            None => Ok(BigUint::from(0u32)),
        }
    }

    pub fn set_total_work(&self, work: &BigUint) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        guard.put(&StoreKey::TotalWork, &StoreValue::Work(work.to_string()))
    }

    pub fn index_wallet_tx(&self, wallet: WalletAddress, tx_hash: Digest) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        let key = StoreKey::WalletIndex(wallet);
        let mut hashes = match guard.get(&key)? {
            Some(StoreValue::WalletIndex(v)) => v,
            Some(_) => return Err(NodeError::Storage("wallet index key holds wrong type".into())),
            None => Vec::new(),
        };
        hashes.push(tx_hash);
        guard.put(&key, &StoreValue::WalletIndex(hashes))
    }

    pub fn wallet_tx_hashes(&self, wallet: WalletAddress) -> NodeResult<Vec<Digest>> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        match guard.get(&StoreKey::WalletIndex(wallet))? {
            Some(StoreValue::WalletIndex(v)) => Ok(v),
            Some(_) => Err(NodeError::Storage("wallet index key holds wrong type".into())),
            None => Ok(Vec::new()),
        }
    }

    pub fn unindex_block_wallets(&self, block: &Block) -> NodeResult<()> {
        for tx in &block.transactions {
            if tx.is_fee {
                continue;
            }
            let mut guard = self.inner.lock().expect("block store lock poisoned");
            let key = StoreKey::WalletIndex(tx.from);
            if let Some(StoreValue::WalletIndex(mut hashes)) = guard.get(&key)? {
                hashes.retain(|h| *h != tx.hash());
                guard.put(&key, &StoreValue::WalletIndex(hashes))?;
            }
        }
        Ok(())
    }

    pub fn clear(&self) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("block store lock poisoned");
        guard.clear()
    }
}
