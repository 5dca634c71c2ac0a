//! TxStore: tx-hash -> block-id index. Used by the executor to reject
//! transactions already confirmed on-chain (`EXPIRED_TRANSACTION`) and by
//! `BlockChain::VerifyTransaction` for the same check pre-admission.

use std::path::Path;
use std::sync::Mutex;

use crate::database::kv_store::KvStore;
use crate::database::rusty::RustyLevelDb;
use crate::errors::NodeResult;
use crate::models::hash::Digest;

pub struct TxStore {
    inner: Mutex<RustyLevelDb<Digest, u64>>,
}

impl TxStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> NodeResult<TxStore> {
        let store = RustyLevelDb::open(db_path, "txdb")?;
        Ok(TxStore {
            inner: Mutex::new(store),
        })
    }

    pub fn has_transaction(&self, hash: Digest) -> NodeResult<bool> {
        let mut guard = self.inner.lock().expect("tx store lock poisoned");
        Ok(guard.get(&hash)?.is_some())
    }

    pub fn insert_transaction(&self, hash: Digest, block_id: u64) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("tx store lock poisoned");
        guard.put(&hash, &block_id)
    }

    pub fn remove_transaction(&self, hash: Digest) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("tx store lock poisoned");
        guard.delete(&hash)?;
        Ok(())
    }

    pub fn block_id_for(&self, hash: Digest) -> NodeResult<Option<u64>> {
        let mut guard = self.inner.lock().expect("tx store lock poisoned");
        guard.get(&hash)
    }

    pub fn clear(&self) -> NodeResult<()> {
        let mut guard = self.inner.lock().expect("tx store lock poisoned");
        guard.clear()
    }
}

#[cfg(test)]
mod tx_store_tests {
    use super::*;

    fn scratch_store(label: &str) -> TxStore {
        let mut path = std::env::temp_dir();
        path.push(format!("pandachain-txdb-{}-{}", label, std::process::id()));
        TxStore::open(path).unwrap()
    }

    #[test]
    fn unknown_tx_is_absent() {
        let store = scratch_store("absent");
        let hash = Digest::hash_bytes(b"tx-a");
        assert!(!store.has_transaction(hash).unwrap());
    }

    #[test]
    fn inserted_tx_is_present_and_maps_to_block() {
        let store = scratch_store("present");
        let hash = Digest::hash_bytes(b"tx-b");
        store.insert_transaction(hash, 7).unwrap();
        assert!(store.has_transaction(hash).unwrap());
        assert_eq!(store.block_id_for(hash).unwrap(), Some(7));
    }

    #[test]
    fn removed_tx_is_absent_again() {
        let store = scratch_store("removed");
        let hash = Digest::hash_bytes(b"tx-c");
        store.insert_transaction(hash, 1).unwrap();
        store.remove_transaction(hash).unwrap();
        assert!(!store.has_transaction(hash).unwrap());
    }
}
