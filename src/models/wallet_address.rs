//! Wallet addresses: a fixed 25-byte identifier derived from an ed25519
//! public key. Layout mirrors the widely used version-byte + hash +
//! checksum scheme: 1 version byte, 20 bytes of `ripemd160(sha256(pubkey))`,
//! 4 bytes of checksum. Key generation and custody are external
//! collaborators; this module only derives the address from a key a caller
//! already has.

use ed25519_dalek::VerifyingKey;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::constants::WALLET_ADDRESS_LEN;

const ADDRESS_VERSION: u8 = 0x0f;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletAddress(pub [u8; WALLET_ADDRESS_LEN]);

impl WalletAddress {
    /// The address that owns all genesis-premine and fee outputs with no
    /// known private key; used as a sentinel `from` for fee transactions.
    pub const NULL: WalletAddress = WalletAddress([0u8; WALLET_ADDRESS_LEN]);

    pub fn from_public_key(key: &VerifyingKey) -> WalletAddress {
        let sha = Sha256::digest(key.as_bytes());
        let ripe = Ripemd160::digest(sha);

        let mut payload = [0u8; 21];
        payload[0] = ADDRESS_VERSION;
        payload[1..].copy_from_slice(&ripe);

        let checksum = checksum(&payload);

        let mut bytes = [0u8; WALLET_ADDRESS_LEN];
        bytes[..21].copy_from_slice(&payload);
        bytes[21..].copy_from_slice(&checksum);
        WalletAddress(bytes)
    }

    pub fn is_valid_checksum(&self) -> bool {
        let payload = &self.0[..21];
        checksum(payload) == self.0[21..]
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_ADDRESS_LEN] {
        &self.0
    }
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod wallet_address_tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn random_verifying_key(seed: u64) -> VerifyingKey {
        let mut rng = StdRng::seed_from_u64(seed);
        SigningKey::generate(&mut rng).verifying_key()
    }

    #[test]
    fn derivation_is_deterministic() {
        let key = random_verifying_key(1);
        let a = WalletAddress::from_public_key(&key);
        let b = WalletAddress::from_public_key(&key);
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_yield_different_addresses() {
        let a = WalletAddress::from_public_key(&random_verifying_key(1));
        let b = WalletAddress::from_public_key(&random_verifying_key(2));
        assert_ne!(a, b);
    }

    #[test]
    fn derived_address_has_valid_checksum() {
        let key = random_verifying_key(3);
        let addr = WalletAddress::from_public_key(&key);
        assert!(addr.is_valid_checksum());
    }

    #[test]
    fn tampered_address_fails_checksum() {
        let key = random_verifying_key(4);
        let mut addr = WalletAddress::from_public_key(&key);
        addr.0[5] ^= 0xff;
        assert!(!addr.is_valid_checksum());
    }

    #[test]
    fn null_address_is_distinct_from_derived() {
        let addr = WalletAddress::from_public_key(&random_verifying_key(5));
        assert_ne!(addr, WalletAddress::NULL);
    }
}
