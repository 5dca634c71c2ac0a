//! Block data model. Like [`crate::models::transaction::Transaction`], the
//! header hash is cached behind a `OnceLock` and invalidated by any mutator
//! that changes header fields (`unset_digest`, `set_nonce`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::hash::Digest;
use crate::models::merkle::merkle_root;
use crate::models::transaction::Transaction;

#[derive(Clone, Serialize, Deserialize)]
struct BlockHeader {
    id: u64,
    timestamp: u64,
    difficulty: u8,
    last_block_hash: Digest,
    merkle_root: Digest,
    nonce: u64,
}

#[readonly::make]
#[derive(Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub timestamp: u64,
    pub difficulty: u8,
    pub last_block_hash: Digest,
    pub merkle_root: Digest,
    pub nonce: u64,
    pub transactions: Vec<Transaction>,

    #[serde(skip)]
    digest: OnceLock<Digest>,
}

impl Block {
    pub fn new(
        id: u64,
        timestamp: u64,
        difficulty: u8,
        last_block_hash: Digest,
        nonce: u64,
        transactions: Vec<Transaction>,
    ) -> Block {
        let merkle_root = merkle_root(&transactions.iter().map(|t| t.hash()).collect::<Vec<_>>());
        Block {
            id,
            timestamp,
            difficulty,
            last_block_hash,
            merkle_root,
            nonce,
            transactions,
            digest: OnceLock::new(),
        }
    }

    fn header(&self) -> BlockHeader {
        BlockHeader {
            id: self.id,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            last_block_hash: self.last_block_hash,
            merkle_root: self.merkle_root,
            nonce: self.nonce,
        }
    }

    pub fn hash(&self) -> Digest {
        *self.digest.get_or_init(|| {
            let encoded = bincode::serialize(&self.header()).expect("header is serializable");
            Digest::hash_bytes(&encoded)
        })
    }

    fn unset_digest(&mut self) {
        self.digest = OnceLock::new();
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.unset_digest();
    }

    pub fn has_proof_of_work(&self) -> bool {
        self.hash().meets_difficulty(self.difficulty)
    }

    pub fn tx_count_within_limit(&self, max: usize) -> bool {
        self.transactions.len() <= max
    }

    pub fn computed_merkle_root(&self) -> Digest {
        merkle_root(
            &self
                .transactions
                .iter()
                .map(|t| t.hash())
                .collect::<Vec<_>>(),
        )
    }

    pub fn merkle_root_matches(&self) -> bool {
        self.merkle_root == self.computed_merkle_root()
    }

    pub fn fee_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_fee)
    }

    pub fn has_exactly_one_fee_transaction(&self) -> bool {
        self.fee_transactions().count() == 1
    }

    pub fn has_duplicate_transaction_hashes(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.transactions.len());
        for tx in &self.transactions {
            if !seen.insert(tx.hash()) {
                return true;
            }
        }
        false
    }

    pub fn is_genesis(&self) -> bool {
        self.id == 1
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Block {}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("hash", &self.hash())
            .field("difficulty", &self.difficulty)
            .field("tx_count", &self.transactions.len())
            .finish()
    }
}
