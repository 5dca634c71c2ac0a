//! HostManager: peer set and best-peer selection (§4.5). Owns the single
//! lock guarding `currentPeers` and the freshness/clock-delta bookkeeping;
//! network I/O always happens outside the lock.

pub mod header_chain;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::{info, warn};

use crate::constants::{ADD_PEER_BRANCH_FACTOR, HOST_MIN_FRESHNESS_SEC, RANDOM_GOOD_HOST_COUNT};
use crate::errors::NodeResult;
use crate::host::header_chain::HeaderChain;
use crate::models::peer_record::PeerRecord;
use crate::peer_client::PeerClient;

struct HostState {
    hosts: Vec<String>,
    records: HashMap<String, PeerRecord>,
    current_peers: Vec<HeaderChain>,
}

pub struct HostManager {
    state: Mutex<HostState>,
    client: Arc<dyn PeerClient>,
    blacklist: HashSet<String>,
    whitelist: HashSet<String>,
    min_host_version: u32,
    network_name: String,
}

impl HostManager {
    pub fn new(
        client: Arc<dyn PeerClient>,
        blacklist: HashSet<String>,
        whitelist: HashSet<String>,
        min_host_version: u32,
        network_name: String,
    ) -> HostManager {
        HostManager {
            state: Mutex::new(HostState {
                hosts: Vec::new(),
                records: HashMap::new(),
                current_peers: Vec::new(),
            }),
            client,
            blacklist,
            whitelist,
            min_host_version,
            network_name,
        }
    }

    fn is_http(addr: &str) -> bool {
        addr.starts_with("http://") || addr.starts_with("https://")
    }

    /// AddPeer: admits a newly announced peer after the usual filters, and
    /// fans the announcement out to a handful of other fresh peers.
    pub async fn add_peer(
        &self,
        addr: &str,
        peer_ts: u64,
        peer_version: u32,
        peer_network: &str,
        local_now: u64,
    ) -> NodeResult<()> {
        if peer_network != self.network_name {
            warn!(addr, peer_network, "peer network mismatch, dropping");
            return Ok(());
        }
        if peer_version < self.min_host_version {
            warn!(addr, peer_version, "peer version too old, dropping");
            return Ok(());
        }
        if self.blacklist.contains(addr) {
            warn!(addr, "peer is blacklisted, dropping");
            return Ok(());
        }

        let is_new = {
            let mut state = self.state.lock().expect("host manager lock poisoned");
            if let Some(record) = state.records.get_mut(addr) {
                record.refresh(local_now, peer_ts);
                false
            } else {
                true
            }
        };

        if !is_new {
            return Ok(());
        }

        if Self::is_http(addr) {
            if self.client.ping(addr).await.is_err() {
                warn!(addr, "peer unreachable, dropping");
                return Ok(());
            }
        }

        if !self.whitelist.is_empty() && !self.whitelist.contains(addr) {
            warn!(addr, "peer not in non-empty whitelist, dropping");
            return Ok(());
        }

        let fanout = {
            let mut state = self.state.lock().expect("host manager lock poisoned");
            state.hosts.push(addr.to_string());
            state
                .records
                .insert(addr.to_string(), PeerRecord::new(addr.to_string(), local_now, peer_ts, peer_version));
            if Self::is_http(addr) && state.current_peers.len() < RANDOM_GOOD_HOST_COUNT {
                state
                    .current_peers
                    .push(HeaderChain::new(addr.to_string()));
            }
            self.sample_fresh_locked(&state, ADD_PEER_BRANCH_FACTOR, local_now, Some(addr))
        };

        for peer in fanout {
            let client = self.client.clone();
            let addr = addr.to_string();
            tokio::spawn(async move {
                let _ = client.ping(&addr).await;
                let _ = peer;
            });
        }

        info!(addr, "admitted new peer");
        Ok(())
    }

    /// NetworkTimestamp: local clock adjusted by the median clock delta of
    /// fresh peers.
    pub fn network_timestamp(&self, local_now: u64) -> u64 {
        let state = self.state.lock().expect("host manager lock poisoned");
        let mut deltas: Vec<i64> = state
            .records
            .values()
            .filter(|r| r.is_fresh(local_now))
            .map(|r| r.clock_delta)
            .collect();
        if deltas.is_empty() {
            return local_now;
        }
        deltas.sort_unstable();
        let mid = deltas.len() / 2;
        let median = if deltas.len() % 2 == 0 {
            (deltas[mid - 1] + deltas[mid]) / 2
        } else {
            deltas[mid]
        };
        (local_now as i64 + median).max(0) as u64
    }

    /// BestPeer: the current peer reporting the greatest chain length.
    pub async fn best_peer(&self) -> Option<String> {
        let candidates: Vec<String> = {
            let state = self.state.lock().expect("host manager lock poisoned");
            state.current_peers.iter().map(|p| p.host().to_string()).collect()
        };
        let mut best: Option<(String, u64)> = None;
        for addr in candidates {
            let Ok(count) = self.client.get_block_count(&addr).await else {
                continue;
            };
            if best.as_ref().map(|(_, h)| count > *h).unwrap_or(true) {
                best = Some((addr, count));
            }
        }
        best.map(|(addr, _)| addr)
    }

    fn sample_fresh_locked(
        &self,
        state: &HostState,
        n: usize,
        local_now: u64,
        exclude: Option<&str>,
    ) -> Vec<String> {
        let mut fresh: Vec<(String, u64)> = state
            .records
            .values()
            .filter(|r| r.is_fresh(local_now) && Self::is_http(&r.address))
            .filter(|r| exclude.map(|e| e != r.address).unwrap_or(true))
            .map(|r| (r.address.clone(), 0u64))
            .collect();
        fresh.truncate(n.max(fresh.len()));
        fresh.into_iter().take(n).map(|(a, _)| a).collect()
    }

    /// SampleFreshHosts: fresh peers ranked by reported block height desc.
    pub async fn sample_fresh_hosts(&self, n: usize, local_now: u64) -> Vec<String> {
        let candidates: Vec<String> = {
            let state = self.state.lock().expect("host manager lock poisoned");
            state
                .records
                .values()
                .filter(|r| r.is_fresh(local_now) && Self::is_http(&r.address))
                .map(|r| r.address.clone())
                .collect()
        };
        let mut ranked = Vec::new();
        for addr in candidates {
            let height = self.client.get_block_count(&addr).await.unwrap_or(0);
            ranked.push((addr, height));
        }
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(n).map(|(a, _)| a).collect()
    }

    /// SyncHeadersWithPeers: replace the current peer set with a fresh
    /// random sample of size `RANDOM_GOOD_HOST_COUNT`, then drive each new
    /// HeaderChain's download one batch forward from its prior height
    /// (§4.6) before publishing the sample.
    pub async fn sync_headers_with_peers(&self, client: &dyn PeerClient, local_now: u64) {
        let fresh = self.sample_fresh_hosts(usize::MAX, local_now).await;
        let mut sample = fresh;
        sample.shuffle(&mut thread_rng());
        sample.truncate(RANDOM_GOOD_HOST_COUNT);

        let carried: HashMap<String, u64> = {
            let state = self.state.lock().expect("host manager lock poisoned");
            state
                .current_peers
                .iter()
                .map(|p| (p.host().to_string(), p.current_downloaded()))
                .collect()
        };

        let mut chains: Vec<HeaderChain> = sample.into_iter().map(HeaderChain::new).collect();
        for chain in &mut chains {
            let host = chain.host().to_string();
            let start = carried.get(&host).copied().unwrap_or(0) + 1;
            match chain
                .download_batch(client, start, &HashMap::new(), &HashSet::new())
                .await
            {
                Ok(count) => info!(host, count, "downloaded header batch"),
                Err(e) => warn!(host, error = %e, "header download failed"),
            }
        }

        let mut state = self.state.lock().expect("host manager lock poisoned");
        state.current_peers = chains;
    }

    /// Periodic peer-ping task body (5 min cadence).
    pub async fn ping_all_known_hosts(&self, local_now: u64) {
        let hosts: Vec<String> = {
            let state = self.state.lock().expect("host manager lock poisoned");
            state.hosts.clone()
        };
        for addr in hosts {
            if let Ok(info) = self.client.ping(&addr).await {
                let mut state = self.state.lock().expect("host manager lock poisoned");
                if let Some(record) = state.records.get_mut(&addr) {
                    record.refresh(local_now, info.timestamp);
                }
            }
        }
    }

    pub fn current_peer_hosts(&self) -> Vec<String> {
        let state = self.state.lock().expect("host manager lock poisoned");
        state.current_peers.iter().map(|p| p.host().to_string()).collect()
    }

    /// Per-peer header download progress, for the header-stats task (§2.9).
    pub fn header_progress(&self) -> Vec<(String, u64)> {
        let state = self.state.lock().expect("host manager lock poisoned");
        state
            .current_peers
            .iter()
            .map(|p| (p.host().to_string(), p.current_downloaded()))
            .collect()
    }
}
