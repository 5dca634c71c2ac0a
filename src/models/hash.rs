//! Canonical 32-byte digest used for transaction/block hashes and the
//! merkle tree. Hashing itself is an external collaborator (we call into
//! `sha2`, never hand-roll it); this type exists so the rest of the crate
//! has one serializable, orderable, displayable digest type to pass around.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub const ZERO: Digest = Digest([0u8; 32]);

    pub fn hash_bytes(data: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Digest(hasher.finalize().into())
    }

    /// Interprets the digest as a big-endian integer and reports whether it
    /// has at least `difficulty` leading zero bits, i.e. satisfies
    /// proof-of-work at that difficulty.
    pub fn meets_difficulty(&self, difficulty: u8) -> bool {
        let mut remaining = difficulty as u32;
        for byte in self.0.iter() {
            if remaining == 0 {
                return true;
            }
            if remaining >= 8 {
                if *byte != 0 {
                    return false;
                }
                remaining -= 8;
            } else {
                return byte.leading_zeros() >= remaining;
            }
        }
        true
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
