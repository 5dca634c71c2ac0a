//! Transaction data model. Canonical hash excludes the signature so that a
//! signature is a proof *over* the hash rather than part of its own input.
//! Hash is cached in a `OnceLock<Digest>` lazily computed by `hash()` and
//! invalidated by replacing the cell whenever a mutator runs, with
//! `PartialEq`/`Eq` implemented via the hash rather than derived (deriving
//! would make a pre-hash and post-hash instance of otherwise-identical
//! data compare unequal).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::TRANSACTION_EXPIRY_SEC;
use crate::models::amount::TransactionAmount;
use crate::models::hash::Digest;
use crate::models::wallet_address::WalletAddress;

#[derive(Clone, Serialize, Deserialize)]
struct TransactionContents {
    from: WalletAddress,
    to: WalletAddress,
    amount: TransactionAmount,
    fee: TransactionAmount,
    timestamp: u64,
    nonce: u64,
    is_fee: bool,
    signing_public_key: [u8; 32],
}

#[readonly::make]
#[derive(Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub amount: TransactionAmount,
    pub fee: TransactionAmount,
    pub timestamp: u64,
    pub nonce: u64,
    pub is_fee: bool,
    pub signing_public_key: VerifyingKey,
    #[serde(with = "opt_signature_bytes")]
    pub signature: Option<[u8; 64]>,

    #[serde(skip)]
    digest: OnceLock<Digest>,
}

/// `serde` only derives `Serialize`/`Deserialize` for arrays up to length
/// 32, so a 64-byte signature needs a manual (de)serialization path.
mod opt_signature_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<[u8; 64]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|bytes| bytes.to_vec()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 64]>, D::Error> {
        let bytes: Option<Vec<u8>> = Option::deserialize(deserializer)?;
        bytes
            .map(|v| {
                <[u8; 64]>::try_from(v.as_slice())
                    .map_err(|_| serde::de::Error::custom("expected 64 signature bytes"))
            })
            .transpose()
    }
}

impl Transaction {
    pub fn new_fee(
        to: WalletAddress,
        amount: TransactionAmount,
        timestamp: u64,
        miner_key: VerifyingKey,
    ) -> Transaction {
        Transaction {
            from: WalletAddress::NULL,
            to,
            amount,
            fee: TransactionAmount::ZERO,
            timestamp,
            nonce: 0,
            is_fee: true,
            signing_public_key: miner_key,
            signature: None,
            digest: OnceLock::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_signed(
        signing_key: &SigningKey,
        to: WalletAddress,
        amount: TransactionAmount,
        fee: TransactionAmount,
        timestamp: u64,
        nonce: u64,
    ) -> Transaction {
        let signing_public_key = signing_key.verifying_key();
        let from = WalletAddress::from_public_key(&signing_public_key);
        let mut tx = Transaction {
            from,
            to,
            amount,
            fee,
            timestamp,
            nonce,
            is_fee: false,
            signing_public_key,
            signature: None,
            digest: OnceLock::new(),
        };
        let sig: Signature = signing_key.sign(tx.hash_contents().0.as_slice());
        tx.signature = Some(sig.to_bytes());
        tx
    }

    fn contents(&self) -> TransactionContents {
        TransactionContents {
            from: self.from,
            to: self.to,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            nonce: self.nonce,
            is_fee: self.is_fee,
            signing_public_key: self.signing_public_key.to_bytes(),
        }
    }

    /// Hash of every field except the signature; this is what the
    /// signature signs over and what uniquely identifies the transaction.
    pub fn hash_contents(&self) -> Digest {
        let encoded = bincode::serialize(&self.contents()).expect("transaction is serializable");
        Digest::hash_bytes(&encoded)
    }

    pub fn hash(&self) -> Digest {
        *self.digest.get_or_init(|| self.hash_contents())
    }

    pub fn is_expired(&self, now_unix: u64) -> bool {
        now_unix.saturating_sub(self.timestamp) > TRANSACTION_EXPIRY_SEC
    }

    /// `¬isFee ⇒ signature valid over canonical hash`. Fee transactions
    /// carry no signature and are never checked here; the block-level
    /// validator enforces there is exactly one of them.
    pub fn signature_valid(&self) -> bool {
        if self.is_fee {
            return true;
        }
        let Some(sig_bytes) = self.signature else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        self.signing_public_key
            .verify(self.hash_contents().0.as_slice(), &signature)
            .is_ok()
    }

    /// `address(signingPublicKey) == from`.
    pub fn wallet_matches_signing_key(&self) -> bool {
        WalletAddress::from_public_key(&self.signing_public_key) == self.from
    }

    pub fn total_outgoing(&self) -> Option<TransactionAmount> {
        self.amount.checked_add(self.fee)
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Transaction {}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash().hash(state);
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("hash", &self.hash())
            .field("from", &self.from)
            .field("to", &self.to)
            .field("amount", &self.amount)
            .field("fee", &self.fee)
            .field("is_fee", &self.is_fee)
            .field("nonce", &self.nonce)
            .finish()
    }
}

#[cfg(test)]
pub mod transaction_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub fn pseudorandom_signing_key(seed: u64) -> SigningKey {
        let mut rng = StdRng::seed_from_u64(seed);
        SigningKey::generate(&mut rng)
    }

    pub fn pseudorandom_transaction(seed: u64, nonce: u64) -> Transaction {
        pseudorandom_transaction_with_fee(seed, nonce, TransactionAmount::from_smallest_unit(1))
    }

    pub fn pseudorandom_transaction_with_fee(
        seed: u64,
        nonce: u64,
        fee: TransactionAmount,
    ) -> Transaction {
        let key = pseudorandom_signing_key(seed);
        Transaction::new_signed(
            &key,
            WalletAddress::from_public_key(&pseudorandom_signing_key(seed + 1).verifying_key()),
            TransactionAmount::from_smallest_unit(1000),
            fee,
            1_700_000_000,
            nonce,
        )
    }

    mod digest_encapsulation {
        use super::*;

        #[test]
        fn hash_is_stable_across_calls() {
            let tx = pseudorandom_transaction(1, 0);
            assert_eq!(tx.hash(), tx.hash());
        }

        #[test]
        fn clone_preserves_hash() {
            let tx = pseudorandom_transaction(2, 0);
            let hash_before = tx.hash();
            let cloned = tx.clone();
            assert_eq!(hash_before, cloned.hash());
        }

        #[test]
        fn different_nonces_hash_differently() {
            let a = pseudorandom_transaction(3, 0);
            let b = pseudorandom_transaction(3, 1);
            assert_ne!(a.hash(), b.hash());
        }
    }

    #[test]
    fn signed_transaction_has_valid_signature() {
        let tx = pseudorandom_transaction(10, 0);
        assert!(tx.signature_valid());
    }

    #[test]
    fn tampered_amount_invalidates_signature() {
        let mut tx = pseudorandom_transaction(11, 0);
        tx.amount = TransactionAmount::from_smallest_unit(999_999);
        assert!(!tx.signature_valid());
    }

    #[test]
    fn fee_transaction_has_no_signature_requirement() {
        let key = pseudorandom_signing_key(20);
        let tx = Transaction::new_fee(
            WalletAddress::from_public_key(&key.verifying_key()),
            TransactionAmount::from_coins(50.0),
            1_700_000_000,
            key.verifying_key(),
        );
        assert!(tx.signature_valid());
        assert!(tx.signature.is_none());
    }

    #[test]
    fn wallet_matches_signing_key_holds_for_signed_sender() {
        let tx = pseudorandom_transaction(30, 0);
        assert!(tx.wallet_matches_signing_key());
    }

    #[test]
    fn expiry_uses_one_hour_window() {
        let tx = pseudorandom_transaction(40, 0);
        assert!(!tx.is_expired(tx.timestamp + 3599));
        assert!(tx.is_expired(tx.timestamp + 3601));
    }

    #[test]
    fn total_outgoing_detects_overflow() {
        let mut tx = pseudorandom_transaction(50, 0);
        tx.amount = TransactionAmount::from_smallest_unit(u64::MAX);
        tx.fee = TransactionAmount::from_smallest_unit(1);
        assert_eq!(tx.total_outgoing(), None);
    }
}
