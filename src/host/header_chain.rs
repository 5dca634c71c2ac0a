//! HeaderChain (§4.6): one peer's header-only view of the chain, built by
//! downloading headers in batches of `BLOCK_HEADERS_PER_FETCH` and verifying
//! each against proof-of-work, checkpoints, and a banned-hash set.

use std::collections::HashMap;

use num_bigint::BigUint;
use tracing::warn;

use crate::constants::BLOCK_HEADERS_PER_FETCH;
use crate::errors::NodeResult;
use crate::models::chain_state::ChainState;
use crate::models::hash::Digest;
use crate::peer_client::{PeerBlockHeader, PeerClient};

pub struct HeaderChain {
    host: String,
    total_work: BigUint,
    heights: HashMap<u64, Digest>,
    downloaded: u64,
}

impl HeaderChain {
    pub fn new(host: String) -> HeaderChain {
        HeaderChain {
            host,
            total_work: BigUint::from(0u32),
            heights: HashMap::new(),
            downloaded: 0,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn total_work(&self) -> &BigUint {
        &self.total_work
    }

    pub fn chain_length(&self) -> u64 {
        self.downloaded
    }

    pub fn hash_at(&self, height: u64) -> Option<Digest> {
        self.heights.get(&height).copied()
    }

    pub fn current_downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Downloads one batch starting at `start`, verifying PoW and hash
    /// continuity, validating against `checkpoints` and rejecting any
    /// header present in `banned_hashes`.
    pub async fn download_batch(
        &mut self,
        client: &dyn PeerClient,
        start: u64,
        checkpoints: &HashMap<u64, Digest>,
        banned_hashes: &std::collections::HashSet<Digest>,
    ) -> NodeResult<usize> {
        let headers = client
            .get_headers(&self.host, start, BLOCK_HEADERS_PER_FETCH)
            .await?;

        let mut prev_hash = self.heights.get(&(start.saturating_sub(1))).copied();
        let mut accepted = 0;

        for header in &headers {
            if banned_hashes.contains(&header.hash) {
                warn!(host = %self.host, id = header.id, "peer offered a banned header hash");
                break;
            }
            if let Some(expected) = checkpoints.get(&header.id) {
                if *expected != header.hash {
                    warn!(host = %self.host, id = header.id, "header fails checkpoint validation");
                    break;
                }
            }
            if let Some(prev) = prev_hash {
                if header.last_block_hash != prev {
                    warn!(host = %self.host, id = header.id, "header does not chain to previous hash");
                    break;
                }
            }
            if !header.hash.meets_difficulty(header.difficulty) {
                warn!(host = %self.host, id = header.id, "header fails proof-of-work check");
                break;
            }

            self.heights.insert(header.id, header.hash);
            self.total_work += ChainState::work_for_difficulty(header.difficulty);
            prev_hash = Some(header.hash);
            self.downloaded += 1;
            accepted += 1;
        }

        Ok(accepted)
    }
}

#[cfg(test)]
mod header_chain_tests {
    use super::*;

    #[test]
    fn fresh_header_chain_has_no_progress() {
        let hc = HeaderChain::new("http://peer".into());
        assert_eq!(hc.chain_length(), 0);
        assert_eq!(hc.hash_at(1), None);
    }
}
